//! Editing session
//!
//! [`EditorSession`] is the single owner of live editor state: the preset
//! manager, a working copy of the active preset, and the collaborators
//! (storage, notifications, seed catalog). Every edit goes through it, so a
//! delete-with-renumber or a drag commit finishes before the caller handles
//! the next input event.

use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::drag::{self, DragOutcome};
use crate::error::{ChainError, Result};
use crate::migration::{self, MigrationReport};
use crate::model::PresetData;
use crate::notify::Notifier;
use crate::persistence::{self, LoadSource};
use crate::presets::PresetManager;
use crate::resolve::{self, MacroSubstitutor, ResolvedPrompt};
use crate::storage::KeyValueStore;
use crate::transfer::{self, ImportKind};
use crate::types::{OrderEntry, PromptEntry, PromptField};

pub struct EditorSession<S: KeyValueStore, N: Notifier> {
    store: S,
    notifier: N,
    catalog: Catalog,
    manager: PresetManager,
    /// Deep copy of the active preset; folded back on save and switch
    working: PresetData,
}

impl<S: KeyValueStore, N: Notifier> EditorSession<S, N> {
    /// Load from storage, repair the active preset and start editing it
    pub fn open(store: S, notifier: N, catalog: Catalog) -> Self {
        let loaded = persistence::load(&store, &catalog);
        match &loaded.source {
            LoadSource::ResetCorrupt(reason) => {
                notifier.error(&format!("Saved presets could not be read and were reset to defaults ({reason})"));
            }
            LoadSource::Legacy => notifier.info("Presets were migrated from the previous storage format"),
            LoadSource::Stored | LoadSource::Defaults => {}
        }

        let mut session = Self {
            store,
            notifier,
            catalog,
            manager: loaded.manager,
            working: PresetData::default(),
        };
        session.activate();
        session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Working copy of the active preset
    pub fn working(&self) -> &PresetData {
        &self.working
    }

    pub fn active_preset(&self) -> &str {
        &self.manager.active_preset
    }

    pub fn preset_names(&self) -> Vec<&str> {
        self.manager.names()
    }

    /// Manager with the working copy folded in
    pub fn snapshot(&self) -> PresetManager {
        let mut manager = self.manager.clone();
        manager
            .presets
            .insert(manager.active_preset.clone(), self.working.clone());
        manager
    }

    /// Materialize the active preset as the working copy and repair it.
    /// Repairs are persisted at once and announced with a single notice.
    fn activate(&mut self) -> MigrationReport {
        self.manager.ensure_active(&self.catalog);
        let mut working = self.manager.active().cloned().unwrap_or_default();
        let report = migration::migrate(&mut working, &self.catalog);
        self.working = working;

        if !report.is_empty() {
            if let Err(e) = self.save() {
                error!(error = %e, "Failed to persist repaired preset");
                self.notifier.error(&format!("Repaired preset could not be saved: {e}"));
            }
            self.notifier.warning(&format!(
                "Preset '{}' was updated to the current layout (sections: {})",
                self.manager.active_preset,
                report.sections().join(", ")
            ));
        }
        info!(preset = %self.manager.active_preset, repairs = report.repairs.len(), "Activated preset");
        report
    }

    fn fold_back(&mut self) {
        self.manager
            .presets
            .insert(self.manager.active_preset.clone(), self.working.clone());
    }

    /// Write every preset, including unsaved working edits, to storage
    pub fn save(&mut self) -> Result<()> {
        self.fold_back();
        persistence::save(&self.store, &self.manager)
    }

    // ---- section edits ---------------------------------------------------

    pub fn add_prompt(&mut self, section: &str) -> usize {
        self.working.insert_prompt(section)
    }

    /// Delete the order entry at `position`; stale positions are ignored
    pub fn delete_item(&mut self, section: &str, position: usize) -> Option<OrderEntry> {
        self.working.delete_entry(section, position)
    }

    /// Edit a prompt; a stale index is logged and ignored
    pub fn update_prompt(&mut self, section: &str, index: usize, field: PromptField) -> bool {
        match self.working.update_prompt_field(section, index, field) {
            Ok(()) => true,
            Err(e) => {
                warn!(section = %section, index, error = %e, "Ignoring edit of missing prompt");
                false
            }
        }
    }

    pub fn reorder(&mut self, section: &str, order: Vec<OrderEntry>) {
        self.working.reorder(section, order);
    }

    /// Restore one section from the catalog defaults
    pub fn reset_section(&mut self, section: &str) -> Result<()> {
        let template = self
            .catalog
            .section(section)
            .ok_or_else(|| ChainError::UnknownSection(section.to_string()))?;
        self.working
            .reset_section(section, &template.default_prompts, &template.default_order);
        Ok(())
    }

    /// Commit a finished drag gesture. Returns true if the order changed.
    pub fn apply_drag(&mut self, outcome: DragOutcome) -> bool {
        match outcome {
            DragOutcome::Reordered { section, order } => {
                self.working.reorder(&section, order);
                true
            }
            DragOutcome::Rejected { .. }
            | DragOutcome::Unchanged { .. }
            | DragOutcome::Click { .. }
            | DragOutcome::Ignored => false,
        }
    }

    /// Move the entry at order position `from` so it ends up at `to`
    pub fn move_entry(&mut self, section: &str, from: usize, to: usize) -> bool {
        let Some(order) = self.working.order(section) else {
            return false;
        };
        if from >= order.len() || to >= order.len() {
            warn!(section = %section, from, to, len = order.len(), "Ignoring move outside the order");
            return false;
        }
        let Some(placeholder) = drag::placeholder_for_move(from, to) else {
            return false;
        };
        let order = drag::commit_order(order, from, placeholder);
        self.working.reorder(section, order);
        true
    }

    // ---- queries ---------------------------------------------------------

    pub fn get_order(&self, section: &str) -> Option<&[OrderEntry]> {
        self.working.order(section)
    }

    pub fn prompts(&self, section: &str) -> Option<&[PromptEntry]> {
        self.working.prompts(section)
    }

    pub async fn resolved_prompts<M>(&self, section: &str, substitutor: &M) -> Option<Vec<ResolvedPrompt>>
    where
        M: MacroSubstitutor + ?Sized,
    {
        resolve::resolve_section(&self.working, section, substitutor).await
    }

    // ---- presets ---------------------------------------------------------

    /// New preset holding a deep copy of the current working state
    pub fn create_preset(&mut self, name: &str) -> Result<()> {
        self.manager.create(name, self.working.clone())
    }

    pub fn switch_preset(&mut self, name: &str) -> Result<MigrationReport> {
        if !self.manager.contains(name) {
            return Err(ChainError::UnknownPreset(name.to_string()));
        }
        self.fold_back();
        self.manager.set_active(name)?;
        Ok(self.activate())
    }

    pub fn rename_preset(&mut self, old: &str, new: &str) -> Result<()> {
        self.fold_back();
        self.manager.rename(old, new)
    }

    pub fn delete_preset(&mut self, name: &str) -> Result<()> {
        self.fold_back();
        let was_active = self.manager.active_preset == name;
        self.manager.delete(name)?;
        if was_active {
            self.activate();
        }
        Ok(())
    }

    // ---- import / export -------------------------------------------------

    pub fn export_section(&self, section: &str) -> Result<String> {
        transfer::export_section_json(&self.working, section)
    }

    /// Replace a section from an import payload. Unrecognized payloads leave
    /// the session untouched.
    pub fn import_section(&mut self, section: &str, raw: &str) -> Result<ImportKind> {
        let imported = match transfer::parse_import(raw, section, &self.catalog) {
            Ok(imported) => imported,
            Err(e) => {
                self.notifier.error(&format!("Import failed: {e}"));
                return Err(e);
            }
        };

        for warning in &imported.warnings {
            self.notifier.warning(warning);
        }
        self.working
            .reset_section(section, &imported.prompts, &imported.order);
        self.notifier.info(&format!(
            "Imported {} prompt(s) into '{section}'",
            imported.prompts.len()
        ));
        Ok(imported.kind)
    }
}
