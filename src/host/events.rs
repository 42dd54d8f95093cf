use serde::Serialize;
use tokio::sync::mpsc;

use crate::{
    overlay::{OverlayFrame, OverlayState, OverlayView},
    surface::{SurfaceState, SurfaceStatus, SurfaceView},
};

use super::TabId;

const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Renders published by the in-process host, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum HostEvent {
    Overlay { tab: TabId, frame: OverlayFrame },
    Surface { state: SurfaceState },
}

impl HostEvent {
    /// Text of a finished analysis (result or error), if this event carries one.
    pub fn final_rendering(&self) -> Option<String> {
        match self {
            HostEvent::Overlay { frame, .. } if frame.state == OverlayState::ShowingResult => {
                frame.feedback.as_ref().map(|bubble| bubble.text.clone())
            }
            HostEvent::Surface { state } => match state.status {
                SurfaceStatus::Done => state.result.as_ref().map(|result| result.summary()),
                SurfaceStatus::Failed => Some(state.status_message.clone()),
                SurfaceStatus::Idle | SurfaceStatus::Analyzing => None,
            },
            HostEvent::Overlay { .. } => None,
        }
    }
}

pub(crate) struct ChannelOverlayView {
    pub(crate) tab: TabId,
    pub(crate) events: mpsc::UnboundedSender<HostEvent>,
}

impl OverlayView for ChannelOverlayView {
    fn render(&self, frame: &OverlayFrame) {
        log_debug!("{} overlay -> {:?}", self.tab, frame.state);
        let _ = self.events.send(HostEvent::Overlay {
            tab: self.tab,
            frame: frame.clone(),
        });
    }
}

pub(crate) struct ChannelSurfaceView {
    pub(crate) events: mpsc::UnboundedSender<HostEvent>,
}

impl SurfaceView for ChannelSurfaceView {
    fn render(&self, state: &SurfaceState) {
        log_debug!("surface -> {:?} {}", state.status, state.status_message);
        let _ = self.events.send(HostEvent::Surface {
            state: state.clone(),
        });
    }
}
