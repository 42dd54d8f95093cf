pub mod controller;
pub mod page;
pub mod state;

pub use controller::{OverlayController, TriggerOutcome};
pub use page::{ClickTarget, OverlayView, PageContext, PageEvent};
pub use state::{FeedbackBubble, OverlayFrame, OverlayModel, OverlayState};
