//! Resolution of a section into the message list sent downstream
//!
//! Prompts are substituted one at a time, in emission order; each call is
//! awaited before the next starts. A failed substitution is logged and the
//! prompt keeps whatever text the call handed back (or its stored text when
//! the call returned nothing), and resolution moves on.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::PresetData;
use crate::types::{PromptEntry, Role};

#[derive(Debug, Error)]
#[error("{message}")]
pub struct SubstitutionError {
    pub message: String,
    /// Text produced before the failure, if any
    pub partial: Option<String>,
}

/// Macro/variable expansion service. Runs on the UI thread, hence `?Send`.
#[async_trait(?Send)]
pub trait MacroSubstitutor {
    async fn substitute(&self, text: &str) -> Result<String, SubstitutionError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPrompt {
    pub role: Role,
    pub content: String,
}

/// Substituted prompts of `section` in emission order, or `None` when the
/// section has no prompts or no order
pub async fn resolve_section<S>(data: &PresetData, section: &str, substitutor: &S) -> Option<Vec<ResolvedPrompt>>
where
    S: MacroSubstitutor + ?Sized,
{
    let prompts: Vec<PromptEntry> = data.ordered_prompts(section)?.into_iter().cloned().collect();

    let mut resolved = Vec::with_capacity(prompts.len());
    for (position, prompt) in prompts.into_iter().enumerate() {
        let content = match substitutor.substitute(&prompt.content).await {
            Ok(text) => text,
            Err(e) => {
                warn!(section = %section, position, error = %e, "Macro substitution failed");
                e.partial.unwrap_or(prompt.content)
            }
        };
        resolved.push(ResolvedPrompt {
            role: prompt.role,
            content,
        });
    }

    debug!(section = %section, count = resolved.len(), "Resolved section");
    Some(resolved)
}

/// Returns text unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentitySubstitutor;

#[async_trait(?Send)]
impl MacroSubstitutor for IdentitySubstitutor {
    async fn substitute(&self, text: &str) -> Result<String, SubstitutionError> {
        Ok(text.to_string())
    }
}

/// Expands `{{name}}` from a fixed variable map. Unknown names are left in
/// place and reported as a failure carrying the partially expanded text.
#[derive(Debug, Default, Clone)]
pub struct VariableSubstitutor {
    vars: HashMap<String, String>,
}

impl VariableSubstitutor {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    fn expand(&self, text: &str) -> (String, Vec<String>) {
        let mut out = String::with_capacity(text.len());
        let mut unknown = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let name = after[..end].trim();
            match self.vars.get(name) {
                Some(value) => out.push_str(value),
                None => {
                    unknown.push(name.to_string());
                    out.push_str(&rest[start..start + 2 + end + 2]);
                }
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        (out, unknown)
    }
}

#[async_trait(?Send)]
impl MacroSubstitutor for VariableSubstitutor {
    async fn substitute(&self, text: &str) -> Result<String, SubstitutionError> {
        let (expanded, unknown) = self.expand(text);
        if unknown.is_empty() {
            Ok(expanded)
        } else {
            Err(SubstitutionError {
                message: format!("unknown macro(s): {}", unknown.join(", ")),
                partial: Some(expanded),
            })
        }
    }
}
