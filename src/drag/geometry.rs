//! Screen-space geometry for list entries
//!
//! All coordinates are viewport pixels; the UI re-measures after scrolling.

use crate::types::OrderEntry;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn mid_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left() && point.x < self.right() && point.y >= self.top() && point.y < self.bottom()
    }
}

/// One rendered list row
#[derive(Debug, Clone, PartialEq)]
pub struct EntryLayout {
    pub section: String,
    /// Position in the section's order sequence
    pub position: usize,
    pub entry: OrderEntry,
    pub rect: Rect,
    /// Drag affordance inside `rect`
    pub handle: Rect,
}

/// Everything the drag controller needs to know about what is on screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListLayout {
    pub entries: Vec<EntryLayout>,
    pub viewport: Rect,
}

impl ListLayout {
    pub fn new(viewport: Rect) -> Self {
        Self {
            entries: Vec::new(),
            viewport,
        }
    }

    /// Entry whose row contains `point`
    pub fn hit_test(&self, point: Point) -> Option<&EntryLayout> {
        self.entries.iter().find(|e| e.rect.contains(point))
    }

    /// Entry whose drag handle contains `point`
    pub fn handle_at(&self, point: Point) -> Option<&EntryLayout> {
        self.entries.iter().find(|e| e.handle.contains(point))
    }

    /// Current visual order of one section, top to bottom
    pub fn section_order(&self, section: &str) -> Vec<OrderEntry> {
        let mut rows: Vec<&EntryLayout> = self.entries.iter().filter(|e| e.section == section).collect();
        rows.sort_by(|a, b| a.rect.top().total_cmp(&b.rect.top()));
        rows.into_iter().map(|e| e.entry.clone()).collect()
    }
}
