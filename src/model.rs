//! Ordered mixed-list model
//!
//! Each section stores its prompts as a slot arena (`Vec<PromptEntry>`) and
//! its emission order as a separate sequence of [`OrderEntry`] values that
//! point into the arena by index. Deleting a slot runs an explicit shift pass
//! over the order sequence so every remaining `Prompt { index }` stays valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::error::{ChainError, Result};
use crate::types::{OrderEntry, PromptEntry, PromptField, Role};

/// All sections of one preset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetData {
    #[serde(default)]
    pub prompts: BTreeMap<String, Vec<PromptEntry>>,
    #[serde(rename = "mixedOrder", alias = "order", default)]
    pub order: BTreeMap<String, Vec<OrderEntry>>,
}

impl PresetData {
    pub fn prompts(&self, section: &str) -> Option<&[PromptEntry]> {
        self.prompts.get(section).map(Vec::as_slice)
    }

    pub fn order(&self, section: &str) -> Option<&[OrderEntry]> {
        self.order.get(section).map(Vec::as_slice)
    }

    /// Sections known to either map, sorted
    pub fn section_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .prompts
            .keys()
            .chain(self.order.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Append an empty system prompt and reference it at the end of the order.
    /// Returns the new slot index.
    pub fn insert_prompt(&mut self, section: &str) -> usize {
        let prompts = self.prompts.entry(section.to_string()).or_default();
        prompts.push(PromptEntry::new(Role::System, ""));
        let index = prompts.len() - 1;

        self.order
            .entry(section.to_string())
            .or_default()
            .push(OrderEntry::prompt(index));

        info!(section = %section, index, "Inserted prompt");
        index
    }

    /// Remove the order entry at `position`, dropping the referenced prompt
    /// slot and renumbering later references when it is a prompt.
    /// Out-of-range positions are ignored and yield `None`.
    pub fn delete_entry(&mut self, section: &str, position: usize) -> Option<OrderEntry> {
        let order = self.order.get_mut(section)?;
        if position >= order.len() {
            debug!(section = %section, position, len = order.len(), "Ignoring delete of stale order position");
            return None;
        }

        let removed = order.remove(position);
        if let OrderEntry::Prompt { index } = removed {
            if let Some(prompts) = self.prompts.get_mut(section)
                && index < prompts.len()
            {
                prompts.remove(index);
            }
            // Any other reference to the removed slot would now dangle
            let before = order.len();
            order.retain(|e| e.prompt_index() != Some(index));
            if order.len() != before {
                warn!(section = %section, index, dropped = before - order.len(), "Dropped duplicate references to deleted prompt");
            }
            shift_refs_after(order, index);
        }

        info!(section = %section, position, entry = %removed, "Deleted order entry");
        Some(removed)
    }

    /// Edit the role or content of an existing prompt slot
    pub fn update_prompt_field(&mut self, section: &str, index: usize, field: PromptField) -> Result<()> {
        let prompt = self
            .prompts
            .get_mut(section)
            .and_then(|prompts| prompts.get_mut(index))
            .ok_or_else(|| ChainError::InvalidIndex {
                section: section.to_string(),
                index,
            })?;

        match field {
            PromptField::Role(role) => prompt.role = role,
            PromptField::Content(content) => prompt.content = content,
        }
        Ok(())
    }

    /// Replace the order sequence wholesale. Indices are taken as given.
    pub fn reorder(&mut self, section: &str, order: Vec<OrderEntry>) {
        debug!(section = %section, len = order.len(), "Replacing order sequence");
        self.order.insert(section.to_string(), order);
    }

    /// Replace both sequences of one section with copies of the given defaults
    pub fn reset_section(&mut self, section: &str, prompts: &[PromptEntry], order: &[OrderEntry]) {
        self.prompts.insert(section.to_string(), prompts.to_vec());
        self.order.insert(section.to_string(), order.to_vec());
        info!(section = %section, prompts = prompts.len(), order = order.len(), "Reset section");
    }

    /// Prompts of a section in emission order, skipping conditional blocks.
    /// `None` when the section lacks prompts or an order.
    pub fn ordered_prompts(&self, section: &str) -> Option<Vec<&PromptEntry>> {
        let prompts = self.prompts.get(section).filter(|p| !p.is_empty())?;
        let order = self.order.get(section).filter(|o| !o.is_empty())?;
        Some(
            order
                .iter()
                .filter_map(OrderEntry::prompt_index)
                .filter_map(|index| prompts.get(index))
                .collect(),
        )
    }

    /// True when every prompt reference in the section points at a live slot
    pub fn refs_valid(&self, section: &str) -> bool {
        let len = self.prompts.get(section).map_or(0, Vec::len);
        self.order
            .get(section)
            .is_none_or(|order| order.iter().filter_map(OrderEntry::prompt_index).all(|i| i < len))
    }
}

/// Decrement every prompt reference above a removed slot
fn shift_refs_after(order: &mut [OrderEntry], removed: usize) {
    for entry in order.iter_mut() {
        if let OrderEntry::Prompt { index } = entry
            && *index > removed
        {
            *index -= 1;
        }
    }
}
