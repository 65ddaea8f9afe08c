//! Seed catalog of sections
//!
//! Each section ships a default template (prompts + order), the conditional
//! blocks it may reference, the block ids that must be present, and any
//! single blocks that later schema versions add in place. Callers may supply
//! their own [`Catalog`]; [`Catalog::builtin`] is what the binary uses.

use crate::model::PresetData;
use crate::types::{OrderEntry, PromptEntry, Role};

/// Display metadata for a placeholder block. Content is never stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalBlock {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl ConditionalBlock {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// A block that must be patched into older orders without resetting them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointInsertion {
    pub block_id: String,
    /// Conditional id the block goes in front of, when present
    pub anchor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SectionTemplate {
    pub key: String,
    pub display_name: String,
    pub default_prompts: Vec<PromptEntry>,
    pub default_order: Vec<OrderEntry>,
    pub blocks: Vec<ConditionalBlock>,
    pub required_ids: Vec<String>,
    pub insertions: Vec<PointInsertion>,
}

impl SectionTemplate {
    pub fn block(&self, id: &str) -> Option<&ConditionalBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Default order fitted to `len` prompts: references past the end are
    /// dropped and prompts the template never references are appended.
    /// Also returns how many references were dropped.
    pub fn order_for(&self, len: usize) -> (Vec<OrderEntry>, usize) {
        let mut order = self.default_order.clone();
        let before = order.len();
        order.retain(|e| e.prompt_index().is_none_or(|i| i < len));
        let dropped = before - order.len();

        for index in 0..len {
            if !order.iter().any(|e| e.prompt_index() == Some(index)) {
                order.push(OrderEntry::prompt(index));
            }
        }
        (order, dropped)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sections: Vec<SectionTemplate>,
}

impl Catalog {
    pub fn new(sections: Vec<SectionTemplate>) -> Self {
        Self { sections }
    }

    pub fn section(&self, key: &str) -> Option<&SectionTemplate> {
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn sections(&self) -> impl Iterator<Item = &SectionTemplate> {
        self.sections.iter()
    }

    /// Fresh preset containing every section's default template
    pub fn default_preset(&self) -> PresetData {
        let mut data = PresetData::default();
        for section in &self.sections {
            data.reset_section(&section.key, &section.default_prompts, &section.default_order);
        }
        data
    }

    /// Built-in summarization and world-book sections
    pub fn builtin() -> Self {
        Self::new(vec![summary(), cwb_summarizer(), cwb_incremental(), plot_director()])
    }
}

fn blocks(list: &[(&str, &str, &str)]) -> Vec<ConditionalBlock> {
    list.iter()
        .map(|(id, name, desc)| ConditionalBlock::new(id, name, desc))
        .collect()
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn world_book_before_history() -> PointInsertion {
    PointInsertion {
        block_id: "world_book".to_string(),
        anchor: Some("chat_history".to_string()),
    }
}

fn summary() -> SectionTemplate {
    SectionTemplate {
        key: "summary".to_string(),
        display_name: "Chat Summary".to_string(),
        default_prompts: vec![
            PromptEntry::new(
                Role::System,
                "You are a careful archivist. Summarize the conversation below for {{char}}.",
            ),
            PromptEntry::new(
                Role::User,
                "Write a concise summary of the new events, keeping names and open threads.",
            ),
        ],
        default_order: vec![
            OrderEntry::prompt(0),
            OrderEntry::conditional("previous_summary"),
            OrderEntry::conditional("world_book"),
            OrderEntry::conditional("chat_history"),
            OrderEntry::prompt(1),
        ],
        blocks: blocks(&[
            ("previous_summary", "Previous Summary", "Summaries already recorded for this chat"),
            ("world_book", "World Book", "Active world-book entries"),
            ("chat_history", "Chat History", "Messages selected for summarization"),
        ]),
        required_ids: ids(&["chat_history"]),
        insertions: vec![world_book_before_history()],
    }
}

fn cwb_summarizer() -> SectionTemplate {
    SectionTemplate {
        key: "cwb_summarizer".to_string(),
        display_name: "Character World Book: Full Rebuild".to_string(),
        default_prompts: vec![
            PromptEntry::new(
                Role::System,
                "You maintain a character world book. Extract stable facts about each character.",
            ),
            PromptEntry::new(
                Role::User,
                "Merge the facts into the existing entries. Output one entry per character.",
            ),
        ],
        default_order: vec![
            OrderEntry::prompt(0),
            OrderEntry::conditional("char_card"),
            OrderEntry::conditional("cwb_existing"),
            OrderEntry::conditional("chat_history"),
            OrderEntry::prompt(1),
        ],
        blocks: blocks(&[
            ("char_card", "Character Card", "Description and personality of the active character"),
            ("cwb_existing", "Existing Entries", "Character world-book entries already stored"),
            ("chat_history", "Chat History", "Messages to mine for character facts"),
        ]),
        required_ids: ids(&["char_card", "cwb_existing", "chat_history"]),
        insertions: Vec::new(),
    }
}

fn cwb_incremental() -> SectionTemplate {
    SectionTemplate {
        key: "cwb_incremental".to_string(),
        display_name: "Character World Book: Incremental".to_string(),
        default_prompts: vec![PromptEntry::new(
            Role::System,
            "Update only the character entries affected by the new messages.",
        )],
        default_order: vec![
            OrderEntry::prompt(0),
            OrderEntry::conditional("cwb_existing"),
            OrderEntry::conditional("new_messages"),
        ],
        blocks: blocks(&[
            ("cwb_existing", "Existing Entries", "Character world-book entries already stored"),
            ("new_messages", "New Messages", "Messages since the last update"),
        ]),
        required_ids: ids(&["cwb_existing", "new_messages"]),
        insertions: Vec::new(),
    }
}

fn plot_director() -> SectionTemplate {
    SectionTemplate {
        key: "plot_director".to_string(),
        display_name: "Plot Director".to_string(),
        default_prompts: vec![
            PromptEntry::new(Role::System, "You plan the next beats of the story without writing prose."),
            PromptEntry::new(Role::User, "Propose three directions the plot could take next."),
        ],
        default_order: vec![
            OrderEntry::prompt(0),
            OrderEntry::conditional("plot_outline"),
            OrderEntry::conditional("world_book"),
            OrderEntry::conditional("chat_history"),
            OrderEntry::prompt(1),
        ],
        blocks: blocks(&[
            ("plot_outline", "Plot Outline", "Current outline notes"),
            ("world_book", "World Book", "Active world-book entries"),
            ("chat_history", "Chat History", "Recent messages"),
        ]),
        required_ids: Vec::new(),
        insertions: vec![world_book_before_history()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults_are_self_consistent() {
        let catalog = Catalog::builtin();
        for section in catalog.sections() {
            let len = section.default_prompts.len();
            for entry in &section.default_order {
                match entry {
                    OrderEntry::Prompt { index } => assert!(*index < len, "{}: bad index", section.key),
                    OrderEntry::Conditional { id } => {
                        assert!(section.block(id).is_some(), "{}: uncatalogued block {id}", section.key)
                    }
                }
            }
            for id in &section.required_ids {
                assert!(section.default_order.contains(&OrderEntry::conditional(id.clone())));
            }
            for insertion in &section.insertions {
                assert!(section.default_order.contains(&OrderEntry::conditional(insertion.block_id.clone())));
            }
        }
    }

    #[test]
    fn test_order_for_fits_prompt_count() {
        let template = summary();

        let (order, dropped) = template.order_for(1);
        assert_eq!(dropped, 1);
        assert_eq!(
            order,
            vec![
                OrderEntry::prompt(0),
                OrderEntry::conditional("previous_summary"),
                OrderEntry::conditional("world_book"),
                OrderEntry::conditional("chat_history"),
            ]
        );

        let (order, dropped) = template.order_for(3);
        assert_eq!(dropped, 0);
        assert_eq!(order.len(), template.default_order.len() + 1);
        assert_eq!(order.last(), Some(&OrderEntry::prompt(2)));

        assert_eq!(template.order_for(2), (template.default_order.clone(), 0));
    }

    #[test]
    fn test_default_preset_has_every_section() {
        let catalog = Catalog::builtin();
        let data = catalog.default_preset();
        for section in catalog.sections() {
            assert!(data.prompts(&section.key).is_some());
            assert!(data.order(&section.key).is_some());
        }
    }
}
