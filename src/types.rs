//! Core value types shared by the model, persistence and transfer layers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChainError;

/// Speaker role of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(ChainError::InvalidRole(other.to_string())),
        }
    }
}

/// One editable prompt, addressed only by its slot index within a section
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromptEntry {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl PromptEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One slot in a section's emission sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OrderEntry {
    /// Reference to `prompts[section][index]`
    Prompt { index: usize },
    /// Placeholder whose content is injected at resolution time
    Conditional { id: String },
}

impl OrderEntry {
    pub fn prompt(index: usize) -> Self {
        OrderEntry::Prompt { index }
    }

    pub fn conditional(id: impl Into<String>) -> Self {
        OrderEntry::Conditional { id: id.into() }
    }

    pub fn prompt_index(&self) -> Option<usize> {
        match self {
            OrderEntry::Prompt { index } => Some(*index),
            OrderEntry::Conditional { .. } => None,
        }
    }

    pub fn conditional_id(&self) -> Option<&str> {
        match self {
            OrderEntry::Prompt { .. } => None,
            OrderEntry::Conditional { id } => Some(id),
        }
    }
}

impl fmt::Display for OrderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderEntry::Prompt { index } => write!(f, "prompt#{index}"),
            OrderEntry::Conditional { id } => write!(f, "[{id}]"),
        }
    }
}

/// Which field of a prompt an edit targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptField {
    Role(Role),
    Content(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_entry_json_shape() {
        let json = serde_json::to_string(&OrderEntry::prompt(2)).unwrap();
        assert_eq!(json, r#"{"type":"prompt","index":2}"#);

        let json = serde_json::to_string(&OrderEntry::conditional("world_book")).unwrap();
        assert_eq!(json, r#"{"type":"conditional","id":"world_book"}"#);
    }

    #[test]
    fn test_prompt_entry_missing_content_defaults_empty() {
        let entry: PromptEntry = serde_json::from_str(r#"{"role":"user"}"#).unwrap();
        assert_eq!(entry, PromptEntry::new(Role::User, ""));
    }

    #[test]
    fn test_role_from_str_case_insensitive() {
        assert_eq!("Assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!(" system ".parse::<Role>().unwrap(), Role::System);
        assert!("narrator".parse::<Role>().is_err());
    }
}
