use serde::{Deserialize, Serialize};

/// A selection must be longer than one character (after trimming) to be worth analyzing.
pub const MIN_SELECTION_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// What the page reports when asked for its current selection.
///
/// `anchor` is the end of the last selection rectangle in page coordinates, or
/// `None` when the page cannot measure the range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveSelection {
    pub text: String,
    pub anchor: Option<Point>,
}

impl LiveSelection {
    pub fn new(text: impl Into<String>, anchor: Option<Point>) -> Self {
        Self {
            text: text.into(),
            anchor,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Trimmed text when it is long enough to analyze.
    pub fn usable_text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        if trimmed.chars().count() >= MIN_SELECTION_CHARS {
            Some(trimmed)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    pub text: String,
    pub anchor_x: f64,
    pub anchor_y: f64,
}

impl SelectionSnapshot {
    /// Builds a snapshot from raw selection text, or `None` when the trimmed
    /// text is empty or a single character.
    pub fn capture(raw: &str, anchor: Point) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < MIN_SELECTION_CHARS {
            return None;
        }

        Some(Self {
            text: trimmed.to_string(),
            anchor_x: anchor.x,
            anchor_y: anchor.y,
        })
    }

    pub fn anchor(&self) -> Point {
        Point::new(self.anchor_x, self.anchor_y)
    }
}
