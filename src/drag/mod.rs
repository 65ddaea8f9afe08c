//! Drag-to-reorder gesture handling
//!
//! A [`DragController`] is a small state machine fed raw pointer positions:
//!
//! - `Idle` → `Pressed` on pointer-down over an entry's drag handle
//! - `Pressed` → `Dragging` once the pointer travels past the threshold
//! - release from `Dragging` commits a new order; release from `Pressed` is a click
//!
//! The controller never touches the model. On release it hands back a
//! [`DragOutcome`] whose order was computed by [`commit_order`], a pure
//! function of the visual order and the placeholder.

pub mod autoscroll;
pub mod geometry;

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::DragSettings;
use crate::types::OrderEntry;
use autoscroll::AutoScroller;
use geometry::{ListLayout, Point};

/// Which side of the hovered entry the dragged entry will land on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    /// Order position of the hovered entry
    pub target: usize,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Pressed {
        origin: Point,
        section: String,
        position: usize,
    },
    Dragging {
        section: String,
        position: usize,
        pointer: Point,
        placeholder: Option<Placeholder>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Release with no gesture in progress
    Ignored,
    /// Press and release without crossing the threshold
    Click { section: String, position: usize },
    /// Drag ended where it started
    Unchanged { section: String },
    /// Drag ended over another section's entry
    Rejected { section: String },
    Reordered { section: String, order: Vec<OrderEntry> },
}

#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    threshold: f32,
    scroller: AutoScroller,
}

impl DragController {
    pub fn new(settings: &DragSettings) -> Self {
        Self {
            state: DragState::Idle,
            threshold: settings.threshold_px,
            scroller: AutoScroller::new(
                settings.autoscroll_margin_px,
                Duration::from_millis(settings.autoscroll_interval_ms),
                settings.autoscroll_step_px,
            ),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn is_auto_scrolling(&self) -> bool {
        self.scroller.is_active()
    }

    /// Begin a gesture if the press lands on a drag handle
    pub fn pointer_down(&mut self, at: Point, layout: &ListLayout) -> bool {
        self.scroller.stop();
        let Some(entry) = layout.handle_at(at) else {
            self.state = DragState::Idle;
            return false;
        };

        debug!(section = %entry.section, position = entry.position, "Drag handle pressed");
        self.state = DragState::Pressed {
            origin: at,
            section: entry.section.clone(),
            position: entry.position,
        };
        true
    }

    /// Track the pointer. Returns the placeholder while dragging.
    pub fn pointer_move(&mut self, at: Point, layout: &ListLayout, now: Instant) -> Option<Placeholder> {
        if let DragState::Pressed { origin, section, position } = &self.state {
            let moved = (at.x - origin.x).abs() > self.threshold || (at.y - origin.y).abs() > self.threshold;
            if !moved {
                return None;
            }
            info!(section = %section, position = *position, "Drag started");
            self.state = DragState::Dragging {
                section: section.clone(),
                position: *position,
                pointer: at,
                placeholder: None,
            };
        }

        let DragState::Dragging {
            section,
            position,
            pointer,
            placeholder,
        } = &mut self.state
        else {
            return None;
        };

        *pointer = at;
        // Foreign sections, gaps and the dragged row itself keep the last placeholder
        if let Some(hovered) = layout.hit_test(at)
            && hovered.section == *section
            && hovered.position != *position
        {
            let side = if at.y < hovered.rect.mid_y() { Side::Before } else { Side::After };
            *placeholder = Some(Placeholder {
                target: hovered.position,
                side,
            });
        }

        self.scroller.update(at, layout.viewport, now);
        *placeholder
    }

    /// Auto-scroll delta to apply to the list's scroll offset, if due
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        if !self.is_dragging() {
            self.scroller.stop();
            return None;
        }
        self.scroller.tick(now)
    }

    /// End the gesture and report what it means for the order
    pub fn pointer_up(&mut self, at: Point, layout: &ListLayout) -> DragOutcome {
        self.scroller.stop();
        let state = std::mem::replace(&mut self.state, DragState::Idle);

        match state {
            DragState::Idle => DragOutcome::Ignored,
            DragState::Pressed { section, position, .. } => DragOutcome::Click { section, position },
            DragState::Dragging {
                section,
                position,
                placeholder,
                ..
            } => {
                if let Some(hovered) = layout.hit_test(at)
                    && hovered.section != section
                {
                    info!(section = %section, over = %hovered.section, "Cross-section drop rejected");
                    return DragOutcome::Rejected { section };
                }

                let Some(placeholder) = placeholder else {
                    return DragOutcome::Unchanged { section };
                };

                let visual = layout.section_order(&section);
                if position >= visual.len() {
                    return DragOutcome::Unchanged { section };
                }
                let order = commit_order(&visual, position, placeholder);
                if order == visual {
                    DragOutcome::Unchanged { section }
                } else {
                    info!(section = %section, from = position, to = placeholder.target, side = ?placeholder.side, "Drag committed");
                    DragOutcome::Reordered { section, order }
                }
            }
        }
    }
}

/// Move the entry at `from` to the placeholder and return the new sequence
pub fn commit_order(visual: &[OrderEntry], from: usize, placeholder: Placeholder) -> Vec<OrderEntry> {
    let mut order = visual.to_vec();
    if from >= order.len() || placeholder.target == from {
        return order;
    }

    let moved = order.remove(from);
    let target = if placeholder.target > from {
        placeholder.target - 1
    } else {
        placeholder.target
    };
    let insert_at = match placeholder.side {
        Side::Before => target,
        Side::After => target + 1,
    };
    order.insert(insert_at.min(order.len()), moved);
    order
}

/// Placeholder that lands the entry at `from` on final position `to`
pub fn placeholder_for_move(from: usize, to: usize) -> Option<Placeholder> {
    if from == to {
        return None;
    }
    let side = if to > from { Side::After } else { Side::Before };
    Some(Placeholder { target: to, side })
}
