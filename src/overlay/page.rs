use crate::models::LiveSelection;

use super::OverlayFrame;

/// Synchronous, read-only view of the page the overlay is embedded in.
pub trait PageContext: Send + Sync {
    fn selection(&self) -> LiveSelection;
}

/// Whatever draws the trigger and the feedback bubble.
pub trait OverlayView: Send + Sync {
    fn render(&self, frame: &OverlayFrame);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// Inside the trigger or feedback subtree.
    Overlay,
    Page,
}

/// Page activity forwarded to the overlay's event loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageEvent {
    SelectionChanged,
    PointerUp { x: f64, y: f64 },
    PointerDown(ClickTarget),
    TriggerActivated,
}
