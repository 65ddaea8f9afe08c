//! Named presets
//!
//! A [`PresetManager`] owns every preset plus the name of the active one.
//! Presets are plain [`PresetData`] values; duplication is always a deep
//! clone so no two presets share sequences.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::constants::preset::DEFAULT_PRESET_NAME;
use crate::error::{ChainError, Result};
use crate::model::PresetData;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetManager {
    #[serde(rename = "activePreset")]
    pub active_preset: String,
    pub presets: BTreeMap<String, PresetData>,
}

impl PresetManager {
    /// Manager holding a single preset built from the catalog defaults
    pub fn with_defaults(catalog: &Catalog) -> Self {
        Self::with_single(DEFAULT_PRESET_NAME, catalog.default_preset())
    }

    pub fn with_single(name: &str, data: PresetData) -> Self {
        let mut presets = BTreeMap::new();
        presets.insert(name.to_string(), data);
        Self {
            active_preset: name.to_string(),
            presets,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&PresetData> {
        self.presets.get(name)
    }

    pub fn active(&self) -> Option<&PresetData> {
        self.presets.get(&self.active_preset)
    }

    /// Make `active_preset` name an existing preset, falling back to the
    /// first one or regenerating defaults. Returns true if anything changed.
    pub fn ensure_active(&mut self, catalog: &Catalog) -> bool {
        if self.presets.contains_key(&self.active_preset) {
            return false;
        }

        if let Some(first) = self.presets.keys().next().cloned() {
            warn!(missing = %self.active_preset, fallback = %first, "Active preset missing, using first available");
            self.active_preset = first;
        } else {
            warn!(missing = %self.active_preset, "No presets stored, regenerating defaults");
            *self = Self::with_defaults(catalog);
        }
        true
    }

    /// Add a new preset under a fresh name
    pub fn create(&mut self, name: &str, data: PresetData) -> Result<()> {
        let name = validate_name(name)?;
        if self.presets.contains_key(&name) {
            return Err(ChainError::PresetExists(name));
        }
        info!(preset = %name, "Created preset");
        self.presets.insert(name, data);
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if !self.presets.contains_key(name) {
            return Err(ChainError::UnknownPreset(name.to_string()));
        }
        self.active_preset = name.to_string();
        Ok(())
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let new = validate_name(new)?;
        if !self.presets.contains_key(old) {
            return Err(ChainError::UnknownPreset(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        if self.presets.contains_key(&new) {
            return Err(ChainError::PresetExists(new));
        }
        let data = self
            .presets
            .remove(old)
            .ok_or_else(|| ChainError::UnknownPreset(old.to_string()))?;
        self.presets.insert(new.clone(), data);
        if self.active_preset == old {
            self.active_preset = new.clone();
        }
        info!(old = %old, new = %new, "Renamed preset");
        Ok(())
    }

    /// Remove a preset. The last preset cannot be deleted; deleting the
    /// active one activates the first remaining preset.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        if !self.presets.contains_key(name) {
            return Err(ChainError::UnknownPreset(name.to_string()));
        }
        if self.presets.len() == 1 {
            return Err(ChainError::LastPreset);
        }

        self.presets.remove(name);
        if self.active_preset == name
            && let Some(first) = self.presets.keys().next()
        {
            self.active_preset = first.clone();
        }
        info!(preset = %name, active = %self.active_preset, "Deleted preset");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ChainError::EmptyPresetName);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PresetManager {
        let catalog = Catalog::builtin();
        let mut manager = PresetManager::with_defaults(&catalog);
        manager.create("Terse", catalog.default_preset()).unwrap();
        manager
    }

    #[test]
    fn test_create_rejects_duplicates_and_blank_names() {
        let mut manager = manager();

        assert!(matches!(
            manager.create("Terse", PresetData::default()),
            Err(ChainError::PresetExists(_))
        ));
        assert!(matches!(
            manager.create("   ", PresetData::default()),
            Err(ChainError::EmptyPresetName)
        ));
        manager.create("  Padded ", PresetData::default()).unwrap();
        assert!(manager.contains("Padded"));
    }

    #[test]
    fn test_delete_last_preset_refused() {
        let catalog = Catalog::builtin();
        let mut manager = PresetManager::with_defaults(&catalog);

        assert!(matches!(manager.delete(DEFAULT_PRESET_NAME), Err(ChainError::LastPreset)));
        assert_eq!(manager.names(), vec![DEFAULT_PRESET_NAME]);
    }

    #[test]
    fn test_delete_active_falls_back_to_first() {
        let mut manager = manager();
        manager.set_active("Terse").unwrap();

        manager.delete("Terse").unwrap();

        assert_eq!(manager.active_preset, DEFAULT_PRESET_NAME);
        assert!(!manager.contains("Terse"));
    }

    #[test]
    fn test_rename_active_follows() {
        let mut manager = manager();

        manager.rename(DEFAULT_PRESET_NAME, "Main").unwrap();

        assert_eq!(manager.active_preset, "Main");
        assert!(manager.contains("Main"));
        assert!(!manager.contains(DEFAULT_PRESET_NAME));
        assert!(matches!(manager.rename("Main", "Terse"), Err(ChainError::PresetExists(_))));
        assert!(matches!(manager.rename("Nope", "X"), Err(ChainError::UnknownPreset(_))));
    }

    #[test]
    fn test_rename_to_same_name() {
        let mut manager = manager();

        assert!(manager.rename(DEFAULT_PRESET_NAME, &format!(" {DEFAULT_PRESET_NAME} ")).is_ok());
        assert!(manager.contains(DEFAULT_PRESET_NAME));
        assert!(matches!(manager.rename("Nope", "Nope"), Err(ChainError::UnknownPreset(_))));
        assert!(matches!(manager.rename("Nope", " Nope "), Err(ChainError::UnknownPreset(_))));
    }

    #[test]
    fn test_ensure_active_falls_back_or_regenerates() {
        let catalog = Catalog::builtin();
        let mut manager = manager();
        manager.active_preset = "Gone".to_string();

        assert!(manager.ensure_active(&catalog));
        assert_eq!(manager.active_preset, DEFAULT_PRESET_NAME);
        assert!(!manager.ensure_active(&catalog));

        manager.presets.clear();
        assert!(manager.ensure_active(&catalog));
        assert_eq!(manager, PresetManager::with_defaults(&catalog));
    }

    #[test]
    fn test_storage_schema_field_names() {
        let json = serde_json::to_value(manager()).unwrap();
        assert_eq!(json["activePreset"], DEFAULT_PRESET_NAME);
        assert!(json["presets"]["Terse"]["mixedOrder"]["summary"].is_array());
    }
}
