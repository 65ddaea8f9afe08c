//! Section export/import
//!
//! Exports are always the single-section `v2.1_section` shape. Imports also
//! accept the older whole-manager `v2.1` shape and a bare map of section key
//! to prompt list. Parsing never touches live state: it yields an
//! [`ImportedSection`] the session applies in one step.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::constants::transfer::{MANAGER_VERSION, SECTION_VERSION};
use crate::error::{ChainError, Result};
use crate::model::PresetData;
use crate::types::{OrderEntry, PromptEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionExport {
    pub presets: BTreeMap<String, Vec<PromptEntry>>,
    #[serde(rename = "mixedOrder")]
    pub mixed_order: BTreeMap<String, Vec<OrderEntry>>,
    pub version: String,
    #[serde(rename = "sectionName")]
    pub section_name: String,
    #[serde(rename = "exportTime")]
    pub export_time: String,
}

pub fn export_section(data: &PresetData, section: &str) -> Result<SectionExport> {
    let prompts = data
        .prompts(section)
        .ok_or_else(|| ChainError::UnknownSection(section.to_string()))?;
    let order = data.order(section).unwrap_or_default();

    Ok(SectionExport {
        presets: BTreeMap::from([(section.to_string(), prompts.to_vec())]),
        mixed_order: BTreeMap::from([(section.to_string(), order.to_vec())]),
        version: SECTION_VERSION.to_string(),
        section_name: section.to_string(),
        export_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub fn export_section_json(data: &PresetData, section: &str) -> Result<String> {
    let export = export_section(data, section)?;
    Ok(serde_json::to_string_pretty(&export)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Section,
    Manager,
    Bare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSection {
    pub kind: ImportKind,
    pub prompts: Vec<PromptEntry>,
    pub order: Vec<OrderEntry>,
    /// User-visible caveats about defaults that were filled in
    pub warnings: Vec<String>,
}

/// Parse an import payload for `section`
pub fn parse_import(raw: &str, section: &str, catalog: &Catalog) -> Result<ImportedSection> {
    let value: Value = serde_json::from_str(raw).map_err(|e| unrecognized(format!("not JSON: {e}")))?;
    let Value::Object(object) = value else {
        return Err(unrecognized("top level is not an object"));
    };

    let imported = match object.get("version").and_then(Value::as_str) {
        Some(SECTION_VERSION) => parse_sectioned(&object, section, catalog, ImportKind::Section)?,
        Some(MANAGER_VERSION) => parse_manager(&object, section, catalog)?,
        Some(other) => return Err(unrecognized(format!("unsupported version '{other}'"))),
        None => parse_bare(&object, section, catalog)?,
    };

    for warning in &imported.warnings {
        warn!(section = %section, warning = %warning, "Import filled in defaults");
    }
    info!(section = %section, kind = ?imported.kind, prompts = imported.prompts.len(), "Parsed import");
    Ok(imported)
}

fn unrecognized(reason: impl Into<String>) -> ChainError {
    ChainError::ImportFormatUnrecognized(reason.into())
}

/// `{ presets: {section: [..]}, mixedOrder: {section: [..]} }`
fn parse_sectioned(
    object: &Map<String, Value>,
    section: &str,
    catalog: &Catalog,
    kind: ImportKind,
) -> Result<ImportedSection> {
    let presets = object
        .get("presets")
        .and_then(Value::as_object)
        .ok_or_else(|| unrecognized("missing 'presets'"))?;

    // Prefer the target key; otherwise the section the file says it holds
    let source_key = if presets.contains_key(section) {
        section.to_string()
    } else {
        object
            .get("sectionName")
            .and_then(Value::as_str)
            .filter(|name| presets.contains_key(*name))
            .map(str::to_string)
            .ok_or_else(|| unrecognized(format!("no prompts for section '{section}'")))?
    };

    let prompts: Vec<PromptEntry> = serde_json::from_value(presets[&source_key].clone())
        .map_err(|e| unrecognized(format!("bad prompt list: {e}")))?;

    let stored_order = object
        .get("mixedOrder")
        .and_then(|o| o.get(&source_key))
        .cloned();

    finish(kind, prompts, stored_order, section, catalog)
}

/// Older whole-manager export. `presets` either maps preset names to preset
/// data or maps sections straight to prompt lists.
fn parse_manager(object: &Map<String, Value>, section: &str, catalog: &Catalog) -> Result<ImportedSection> {
    let presets = object
        .get("presets")
        .and_then(Value::as_object)
        .ok_or_else(|| unrecognized("missing 'presets'"))?;

    if presets.values().all(Value::is_array) {
        return parse_sectioned(object, section, catalog, ImportKind::Manager);
    }

    let active = object.get("activePreset").and_then(Value::as_str);
    let preset = active
        .and_then(|name| presets.get(name))
        .or_else(|| presets.values().next())
        .ok_or_else(|| unrecognized("no presets in file"))?;

    let data: PresetData = serde_json::from_value(preset.clone())
        .map_err(|e| unrecognized(format!("bad preset data: {e}")))?;
    let prompts = data
        .prompts(section)
        .ok_or_else(|| unrecognized(format!("no prompts for section '{section}'")))?
        .to_vec();
    let stored_order = data
        .order(section)
        .map(|order| serde_json::to_value(order))
        .transpose()?;

    finish(ImportKind::Manager, prompts, stored_order, section, catalog)
}

/// `{ section: [PromptEntry, ..] }` with no order at all
fn parse_bare(object: &Map<String, Value>, section: &str, catalog: &Catalog) -> Result<ImportedSection> {
    let list = object
        .get(section)
        .filter(|v| v.is_array())
        .ok_or_else(|| unrecognized(format!("no recognizable data for section '{section}'")))?;
    let prompts: Vec<PromptEntry> = serde_json::from_value(list.clone())
        .map_err(|e| unrecognized(format!("bad prompt list: {e}")))?;

    finish(ImportKind::Bare, prompts, None, section, catalog)
}

fn finish(
    kind: ImportKind,
    prompts: Vec<PromptEntry>,
    stored_order: Option<Value>,
    section: &str,
    catalog: &Catalog,
) -> Result<ImportedSection> {
    let mut warnings = Vec::new();

    let order = match stored_order {
        Some(value) => {
            let order: Vec<OrderEntry> =
                serde_json::from_value(value).map_err(|e| unrecognized(format!("bad order list: {e}")))?;
            if let Some(bad) = order.iter().filter_map(OrderEntry::prompt_index).find(|i| *i >= prompts.len()) {
                return Err(unrecognized(format!(
                    "order references prompt {bad} but only {} prompts are present",
                    prompts.len()
                )));
            }
            order
        }
        None => {
            warnings.push(format!("No order found for '{section}', using the built-in order"));
            default_order(section, prompts.len(), catalog, &mut warnings)
        }
    };

    if let Some(template) = catalog.section(section) {
        let missing: Vec<&str> = template
            .required_ids
            .iter()
            .filter(|id| !order.iter().any(|e| e.conditional_id() == Some(id.as_str())))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            warnings.push(format!(
                "Imported order lacks required blocks {missing:?}; the section will be reset on next load"
            ));
        }
    }

    Ok(ImportedSection {
        kind,
        prompts,
        order,
        warnings,
    })
}

/// Template order for known sections, fitted to the imported prompt count.
/// Unknown sections get one reference per prompt.
fn default_order(section: &str, len: usize, catalog: &Catalog, warnings: &mut Vec<String>) -> Vec<OrderEntry> {
    let Some(template) = catalog.section(section) else {
        return (0..len).map(OrderEntry::prompt).collect();
    };

    let (order, dropped) = template.order_for(len);
    if dropped > 0 {
        warnings.push(format!(
            "Dropped {dropped} built-in order reference(s) past the {len} imported prompt(s)"
        ));
    }
    order
}
