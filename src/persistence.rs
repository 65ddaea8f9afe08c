//! Loading and saving the preset manager through a key-value store
//!
//! The whole manager is one JSON blob under [`PRESETS_KEY`]. Older installs
//! kept a single unnamed preset in two blobs; those are converted once and
//! removed. Nothing here fails the caller on bad data: a corrupt blob is
//! replaced by defaults and reported through [`LoadSource::ResetCorrupt`].

use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::constants::preset::DEFAULT_PRESET_NAME;
use crate::constants::storage::{LEGACY_ORDER_KEY, LEGACY_PROMPTS_KEY, PRESETS_KEY};
use crate::error::{ChainError, Result};
use crate::model::PresetData;
use crate::presets::PresetManager;
use crate::storage::KeyValueStore;
use crate::types::{OrderEntry, PromptEntry};

/// Where the loaded manager came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Stored,
    Legacy,
    Defaults,
    /// Stored blob was unusable; holds the reason shown to the user
    ResetCorrupt(String),
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub manager: PresetManager,
    pub source: LoadSource,
}

pub fn load(store: &dyn KeyValueStore, catalog: &Catalog) -> Loaded {
    let raw = match store.get(PRESETS_KEY) {
        Ok(raw) => raw,
        Err(e) => {
            error!(key = PRESETS_KEY, error = ?e, "Failed to read presets from storage");
            return Loaded {
                manager: PresetManager::with_defaults(catalog),
                source: LoadSource::ResetCorrupt(format!("{e:#}")),
            };
        }
    };

    let Some(raw) = raw else {
        if let Some(manager) = migrate_legacy(store, catalog) {
            return Loaded {
                manager,
                source: LoadSource::Legacy,
            };
        }
        info!("No stored presets, starting from defaults");
        return Loaded {
            manager: PresetManager::with_defaults(catalog),
            source: LoadSource::Defaults,
        };
    };

    match parse_manager(&raw) {
        Ok(mut manager) => {
            manager.ensure_active(catalog);
            info!(presets = manager.presets.len(), active = %manager.active_preset, "Loaded presets");
            Loaded {
                manager,
                source: LoadSource::Stored,
            }
        }
        Err(e) => {
            error!(key = PRESETS_KEY, error = %e, "Stored presets are invalid, resetting to defaults");
            Loaded {
                manager: PresetManager::with_defaults(catalog),
                source: LoadSource::ResetCorrupt(e.to_string()),
            }
        }
    }
}

/// Overwrite the stored blob with the full manager
pub fn save(store: &dyn KeyValueStore, manager: &PresetManager) -> Result<()> {
    let json = serde_json::to_string(manager)?;
    store.set(PRESETS_KEY, &json)?;
    info!(presets = manager.presets.len(), active = %manager.active_preset, "Saved presets");
    Ok(())
}

/// Structural validation first, so a missing top-level key is reported by
/// name rather than as a serde path
fn parse_manager(raw: &str) -> Result<PresetManager> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ChainError::StorageCorrupt(e.to_string()))?;

    let Some(object) = value.as_object() else {
        return Err(ChainError::StorageCorrupt("top level is not an object".to_string()));
    };
    if !object.get("presets").is_some_and(|p| p.is_object()) {
        return Err(ChainError::StorageCorrupt("missing 'presets'".to_string()));
    }
    if !object.get("activePreset").is_some_and(|a| a.is_string()) {
        return Err(ChainError::StorageCorrupt("missing 'activePreset'".to_string()));
    }

    serde_json::from_value(value).map_err(|e| ChainError::StorageCorrupt(e.to_string()))
}

/// Convert the two legacy blobs into a one-preset manager, persist it and
/// drop the legacy keys. `None` when there is nothing usable to convert.
fn migrate_legacy(store: &dyn KeyValueStore, catalog: &Catalog) -> Option<PresetManager> {
    let raw_prompts = store
        .get(LEGACY_PROMPTS_KEY)
        .inspect_err(|e| warn!(key = LEGACY_PROMPTS_KEY, error = ?e, "Failed to read legacy prompts"))
        .ok()
        .flatten()?;

    let prompts: BTreeMap<String, Vec<PromptEntry>> = match serde_json::from_str(&raw_prompts) {
        Ok(prompts) => prompts,
        Err(e) => {
            warn!(key = LEGACY_PROMPTS_KEY, error = %e, "Legacy prompts unreadable, ignoring");
            return None;
        }
    };

    let mut order: BTreeMap<String, Vec<OrderEntry>> = store
        .get(LEGACY_ORDER_KEY)
        .ok()
        .flatten()
        .and_then(|raw| {
            serde_json::from_str(&raw)
                .inspect_err(|e| warn!(key = LEGACY_ORDER_KEY, error = %e, "Legacy order unreadable, using defaults"))
                .ok()
        })
        .unwrap_or_default();

    for (section, entries) in &prompts {
        if order.contains_key(section) {
            continue;
        }
        let fallback = match catalog.section(section) {
            Some(template) => {
                let (fitted, dropped) = template.order_for(entries.len());
                if dropped > 0 {
                    debug!(section = %section, dropped, "Fitted template order to legacy prompts");
                }
                fitted
            }
            None => (0..entries.len()).map(OrderEntry::prompt).collect(),
        };
        order.insert(section.clone(), fallback);
    }

    let manager = PresetManager::with_single(DEFAULT_PRESET_NAME, PresetData { prompts, order });

    if let Err(e) = save(store, &manager) {
        error!(error = %e, "Failed to persist migrated legacy presets; keeping legacy keys");
        return Some(manager);
    }
    for key in [LEGACY_PROMPTS_KEY, LEGACY_ORDER_KEY] {
        if let Err(e) = store.remove(key) {
            warn!(key = key, error = ?e, "Failed to remove legacy key");
        }
    }
    info!(sections = manager.presets[DEFAULT_PRESET_NAME].prompts.len(), "Migrated legacy single-preset storage");
    Some(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::Role;

    #[test]
    fn test_empty_store_yields_defaults() {
        let catalog = Catalog::builtin();
        let store = MemoryStore::new();

        let loaded = load(&store, &catalog);

        assert_eq!(loaded.source, LoadSource::Defaults);
        assert_eq!(loaded.manager, PresetManager::with_defaults(&catalog));
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let catalog = Catalog::builtin();
        let store = MemoryStore::new();
        let mut manager = PresetManager::with_defaults(&catalog);
        let mut custom = catalog.default_preset();
        custom.insert_prompt("summary");
        custom
            .update_prompt_field("summary", 2, crate::types::PromptField::Content("extra".into()))
            .unwrap();
        custom.delete_entry("summary", 1);
        manager.create("Custom", custom).unwrap();
        manager.set_active("Custom").unwrap();

        save(&store, &manager).unwrap();
        let loaded = load(&store, &catalog);

        assert_eq!(loaded.source, LoadSource::Stored);
        assert_eq!(loaded.manager, manager);
    }

    #[test]
    fn test_missing_presets_key_is_corrupt() {
        let catalog = Catalog::builtin();
        let store = MemoryStore::with_entries([(PRESETS_KEY, r#"{"activePreset":"x"}"#)]);

        let loaded = load(&store, &catalog);

        assert!(matches!(&loaded.source, LoadSource::ResetCorrupt(reason) if reason.contains("presets")));
        assert_eq!(loaded.manager, PresetManager::with_defaults(&catalog));
    }

    #[test]
    fn test_missing_active_key_and_garbage_are_corrupt() {
        let catalog = Catalog::builtin();

        let store = MemoryStore::with_entries([(PRESETS_KEY, r#"{"presets":{}}"#)]);
        assert!(matches!(load(&store, &catalog).source, LoadSource::ResetCorrupt(_)));

        let store = MemoryStore::with_entries([(PRESETS_KEY, "not json")]);
        assert!(matches!(load(&store, &catalog).source, LoadSource::ResetCorrupt(_)));

        let store = MemoryStore::with_entries([(
            PRESETS_KEY,
            r#"{"activePreset":"a","presets":{"a":{"prompts":{"s":[{"role":"wizard"}]}}}}"#,
        )]);
        assert!(matches!(load(&store, &catalog).source, LoadSource::ResetCorrupt(_)));
    }

    #[test]
    fn test_dangling_active_preset_falls_back() {
        let catalog = Catalog::builtin();
        let store = MemoryStore::with_entries([(
            PRESETS_KEY,
            r#"{"activePreset":"gone","presets":{"kept":{"prompts":{},"mixedOrder":{}}}}"#,
        )]);

        let loaded = load(&store, &catalog);

        assert_eq!(loaded.source, LoadSource::Stored);
        assert_eq!(loaded.manager.active_preset, "kept");
    }

    #[test]
    fn test_legacy_migration_runs_once_and_removes_keys() {
        let catalog = Catalog::builtin();
        let store = MemoryStore::with_entries([
            (
                LEGACY_PROMPTS_KEY,
                r#"{"summary":[{"role":"system","content":"old"}],"notes":[{"role":"user","content":"n"}]}"#,
            ),
            (
                LEGACY_ORDER_KEY,
                r#"{"summary":[{"type":"prompt","index":0},{"type":"conditional","id":"chat_history"}]}"#,
            ),
        ]);

        let loaded = load(&store, &catalog);

        assert_eq!(loaded.source, LoadSource::Legacy);
        let data = loaded.manager.active().unwrap();
        assert_eq!(data.prompts("summary").unwrap(), &[PromptEntry::new(Role::System, "old")]);
        assert_eq!(data.order("summary").unwrap().len(), 2);
        // Unknown legacy section gets a sequential order
        assert_eq!(data.order("notes").unwrap(), &[OrderEntry::prompt(0)]);

        assert!(!store.contains(LEGACY_PROMPTS_KEY));
        assert!(!store.contains(LEGACY_ORDER_KEY));
        assert!(store.contains(PRESETS_KEY));
        assert_eq!(load(&store, &catalog).source, LoadSource::Stored);
    }

    #[test]
    fn test_legacy_short_section_gets_fitted_order() {
        let catalog = Catalog::builtin();
        let store = MemoryStore::with_entries([(
            LEGACY_PROMPTS_KEY,
            r#"{"summary":[{"role":"system","content":"mine"}]}"#,
        )]);

        let loaded = load(&store, &catalog);

        let data = loaded.manager.active().unwrap();
        assert!(data.refs_valid("summary"));
        assert_eq!(data.order("summary").unwrap()[0], OrderEntry::prompt(0));
        assert!(data.order("summary").unwrap().contains(&OrderEntry::conditional("chat_history")));
    }

    #[test]
    fn test_legacy_without_order_uses_template_order() {
        let catalog = Catalog::builtin();
        let store = MemoryStore::with_entries([(
            LEGACY_PROMPTS_KEY,
            r#"{"cwb_incremental":[{"role":"system","content":"kept"}]}"#,
        )]);

        let loaded = load(&store, &catalog);

        let template = catalog.section("cwb_incremental").unwrap();
        assert_eq!(
            loaded.manager.active().unwrap().order("cwb_incremental").unwrap(),
            template.default_order.as_slice()
        );
    }
}
