//! Structural repair of stored presets
//!
//! Repairs are an ordered list of independent rules. Each rule pairs a
//! `detect` predicate with a `repair` transform over one section; the engine
//! sweeps every catalogued section with every rule and repeats until a full
//! pass changes nothing. Sections unknown to the catalog are never touched.

use tracing::{info, warn};

use crate::catalog::{Catalog, PointInsertion, SectionTemplate};
use crate::constants::migration::MAX_PASSES;
use crate::model::PresetData;
use crate::types::{OrderEntry, PromptEntry};

/// Detached copy of one section's two sequences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub prompts: Option<Vec<PromptEntry>>,
    pub order: Option<Vec<OrderEntry>>,
}

impl Section {
    fn extract(data: &PresetData, key: &str) -> Self {
        Self {
            prompts: data.prompts.get(key).cloned(),
            order: data.order.get(key).cloned(),
        }
    }

    fn write_back(self, data: &mut PresetData, key: &str) {
        match self.prompts {
            Some(prompts) => data.prompts.insert(key.to_string(), prompts),
            None => data.prompts.remove(key),
        };
        match self.order {
            Some(order) => data.order.insert(key.to_string(), order),
            None => data.order.remove(key),
        };
    }

    fn from_template(template: &SectionTemplate) -> Self {
        Self {
            prompts: Some(template.default_prompts.clone()),
            order: Some(template.default_order.clone()),
        }
    }

    fn has_block(&self, id: &str) -> bool {
        self.order
            .as_ref()
            .is_some_and(|order| order.iter().any(|e| e.conditional_id() == Some(id)))
    }
}

pub struct RepairRule {
    pub name: &'static str,
    pub detect: fn(&Section, &SectionTemplate) -> bool,
    pub repair: fn(Section, &SectionTemplate) -> Section,
}

/// Rules in application order
pub const RULES: &[RepairRule] = &[
    RepairRule {
        name: "missing_section",
        detect: |section, _| section.prompts.is_none() || section.order.is_none(),
        repair: |_, template| Section::from_template(template),
    },
    RepairRule {
        name: "dangling_prompt_ref",
        detect: |section, _| {
            let len = section.prompts.as_ref().map_or(0, Vec::len);
            section.order.as_ref().is_some_and(|order| {
                order.iter().filter_map(OrderEntry::prompt_index).any(|i| i >= len)
            })
        },
        repair: |_, template| Section::from_template(template),
    },
    RepairRule {
        name: "required_blocks",
        detect: |section, template| template.required_ids.iter().any(|id| !section.has_block(id)),
        repair: |_, template| Section::from_template(template),
    },
    RepairRule {
        name: "point_insertion",
        detect: |section, template| {
            template
                .insertions
                .iter()
                .any(|insertion| !section.has_block(&insertion.block_id))
        },
        repair: |mut section, template| {
            if let Some(order) = section.order.as_mut() {
                for insertion in &template.insertions {
                    if !order.iter().any(|e| e.conditional_id() == Some(insertion.block_id.as_str())) {
                        insert_block(order, insertion);
                    }
                }
            }
            section
        },
    },
];

/// Place a missing block before its anchor, else after the last prompt,
/// else at the end
fn insert_block(order: &mut Vec<OrderEntry>, insertion: &PointInsertion) {
    let anchored = insertion.anchor.as_deref().and_then(|anchor| {
        order
            .iter()
            .position(|e| e.conditional_id() == Some(anchor))
    });
    let position = anchored
        .or_else(|| {
            order
                .iter()
                .rposition(|e| e.prompt_index().is_some())
                .map(|last| last + 1)
        })
        .unwrap_or(order.len());

    order.insert(position, OrderEntry::conditional(insertion.block_id.clone()));
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub section: String,
    pub rule: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub repairs: Vec<Repair>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.repairs.is_empty()
    }

    /// Distinct repaired section keys, in first-repair order
    pub fn sections(&self) -> Vec<&str> {
        let mut sections: Vec<&str> = Vec::new();
        for repair in &self.repairs {
            if !sections.contains(&repair.section.as_str()) {
                sections.push(&repair.section);
            }
        }
        sections
    }
}

/// Apply every rule until the preset is stable. Never fails.
pub fn migrate(data: &mut PresetData, catalog: &Catalog) -> MigrationReport {
    let mut report = MigrationReport::default();

    for pass in 0..MAX_PASSES {
        let mut changed = false;

        for template in catalog.sections() {
            for rule in RULES {
                let section = Section::extract(data, &template.key);
                if !(rule.detect)(&section, template) {
                    continue;
                }

                warn!(section = %template.key, rule = rule.name, pass, "Repairing section");
                (rule.repair)(section, template).write_back(data, &template.key);
                report.repairs.push(Repair {
                    section: template.key.clone(),
                    rule: rule.name,
                });
                changed = true;
            }
        }

        if !changed {
            break;
        }
        if pass + 1 == MAX_PASSES {
            warn!(passes = MAX_PASSES, "Repair rules did not settle; leaving preset as is");
        }
    }

    if !report.is_empty() {
        info!(repairs = report.repairs.len(), sections = ?report.sections(), "Preset repaired");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn catalog() -> Catalog {
        Catalog::builtin()
    }

    #[test]
    fn test_default_preset_needs_no_repair() {
        let catalog = catalog();
        let mut data = catalog.default_preset();

        let report = migrate(&mut data, &catalog);

        assert!(report.is_empty());
        assert_eq!(data, catalog.default_preset());
    }

    #[test]
    fn test_missing_required_block_resets_section() {
        let catalog = catalog();
        let mut data = catalog.default_preset();
        data.prompts.insert(
            "cwb_summarizer".to_string(),
            vec![PromptEntry::new(Role::User, "custom")],
        );
        data.order.insert(
            "cwb_summarizer".to_string(),
            vec![OrderEntry::prompt(0), OrderEntry::conditional("char_card")],
        );

        let report = migrate(&mut data, &catalog);

        assert_eq!(
            report.repairs,
            vec![Repair { section: "cwb_summarizer".into(), rule: "required_blocks" }]
        );
        let template = catalog.section("cwb_summarizer").unwrap();
        assert_eq!(data.prompts("cwb_summarizer").unwrap(), template.default_prompts.as_slice());
        assert_eq!(data.order("cwb_summarizer").unwrap(), template.default_order.as_slice());
    }

    #[test]
    fn test_migration_converges_and_reruns_are_noops() {
        let catalog = catalog();
        let mut data = catalog.default_preset();
        data.order.insert("cwb_incremental".to_string(), vec![OrderEntry::prompt(0)]);
        data.order.remove("summary");

        let first = migrate(&mut data, &catalog);
        assert!(!first.is_empty());
        for template in catalog.sections() {
            for id in &template.required_ids {
                assert!(data.order(&template.key).unwrap().contains(&OrderEntry::conditional(id.clone())));
            }
        }

        let snapshot = data.clone();
        let second = migrate(&mut data, &catalog);
        assert!(second.is_empty());
        assert_eq!(data, snapshot);
    }

    #[test]
    fn test_absent_section_inserted_from_template() {
        let catalog = catalog();
        let mut data = catalog.default_preset();
        data.prompts.remove("plot_director");
        data.order.remove("plot_director");

        let report = migrate(&mut data, &catalog);

        assert_eq!(report.sections(), vec!["plot_director"]);
        assert_eq!(report.repairs[0].rule, "missing_section");
        assert!(data.order("plot_director").is_some());
    }

    #[test]
    fn test_point_insertion_before_anchor_keeps_user_edits() {
        let catalog = catalog();
        let mut data = catalog.default_preset();
        data.prompts.insert(
            "summary".to_string(),
            vec![PromptEntry::new(Role::System, "mine"), PromptEntry::new(Role::User, "also mine")],
        );
        data.order.insert(
            "summary".to_string(),
            vec![
                OrderEntry::prompt(1),
                OrderEntry::conditional("chat_history"),
                OrderEntry::prompt(0),
            ],
        );

        let report = migrate(&mut data, &catalog);

        assert_eq!(report.repairs[0].rule, "point_insertion");
        assert_eq!(data.prompts("summary").unwrap()[0].content, "mine");
        assert_eq!(
            data.order("summary").unwrap(),
            &[
                OrderEntry::prompt(1),
                OrderEntry::conditional("world_book"),
                OrderEntry::conditional("chat_history"),
                OrderEntry::prompt(0),
            ]
        );
    }

    #[test]
    fn test_point_insertion_without_anchor_goes_after_last_prompt() {
        let template = catalog().section("plot_director").unwrap().clone();
        let mut order = vec![
            OrderEntry::prompt(0),
            OrderEntry::conditional("plot_outline"),
            OrderEntry::prompt(1),
            OrderEntry::conditional("tail"),
        ];

        insert_block(&mut order, &template.insertions[0]);

        assert_eq!(order[3], OrderEntry::conditional("world_book"));
        assert_eq!(order[4], OrderEntry::conditional("tail"));
    }

    #[test]
    fn test_point_insertion_empty_order_appends() {
        let insertion = PointInsertion { block_id: "world_book".into(), anchor: None };
        let mut order = vec![OrderEntry::conditional("only")];

        insert_block(&mut order, &insertion);

        assert_eq!(order, vec![OrderEntry::conditional("only"), OrderEntry::conditional("world_book")]);
    }

    #[test]
    fn test_dangling_reference_resets_section() {
        let catalog = catalog();
        let mut data = catalog.default_preset();
        data.order.get_mut("summary").unwrap().push(OrderEntry::prompt(7));

        let report = migrate(&mut data, &catalog);

        assert_eq!(report.repairs[0].rule, "dangling_prompt_ref");
        assert!(data.refs_valid("summary"));
    }

    #[test]
    fn test_unknown_sections_left_untouched() {
        let catalog = catalog();
        let mut data = catalog.default_preset();
        data.prompts.insert("homebrew".to_string(), Vec::new());
        data.order.insert("homebrew".to_string(), vec![OrderEntry::prompt(5)]);

        let report = migrate(&mut data, &catalog);

        assert!(report.is_empty());
        assert_eq!(data.order("homebrew").unwrap(), &[OrderEntry::prompt(5)]);
    }
}
