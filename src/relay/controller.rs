use std::sync::Arc;

use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    error::SentimentError,
    host::{SurfaceLauncher, TabDirectory, TabId},
    messaging::{Delivery, Envelope, Inbox, MessageKind},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Per-request relay machine: `Idle -> AttemptingOpen -> {Forwarded | FallbackRequested}`,
/// then back to `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayPhase {
    #[default]
    Idle,
    AttemptingOpen,
    Forwarded,
    FallbackRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Forwarded,
    FallbackRequested { tab: TabId },
    /// No destination for the fallback. Not surfaced to anyone.
    Dropped(SentimentError),
}

impl RelayOutcome {
    pub fn phase(&self) -> RelayPhase {
        match self {
            RelayOutcome::Forwarded => RelayPhase::Forwarded,
            RelayOutcome::FallbackRequested { .. } => RelayPhase::FallbackRequested,
            RelayOutcome::Dropped(_) => RelayPhase::Idle,
        }
    }
}

/// Decides where an analysis request goes. Never looks at the payload.
#[derive(Clone)]
pub struct Relay {
    launcher: Option<Arc<dyn SurfaceLauncher>>,
    tabs: Arc<dyn TabDirectory>,
    phase: Arc<Mutex<RelayPhase>>,
}

impl Relay {
    pub fn new(launcher: Option<Arc<dyn SurfaceLauncher>>, tabs: Arc<dyn TabDirectory>) -> Self {
        Self {
            launcher,
            tabs,
            phase: Arc::new(Mutex::new(RelayPhase::Idle)),
        }
    }

    pub async fn phase(&self) -> RelayPhase {
        *self.phase.lock().await
    }

    pub async fn handle_analysis_request(&self, envelope: Envelope) -> RelayOutcome {
        let correlation_id = envelope.correlation_id;
        self.set_phase(RelayPhase::AttemptingOpen).await;

        let outcome = match self.forward_to_surface(&envelope).await {
            Ok(()) => RelayOutcome::Forwarded,
            Err(err) => {
                log_info!("[{}] {err}; asking the page to analyze", correlation_id);
                self.request_fallback(&envelope).await
            }
        };

        self.set_phase(outcome.phase()).await;
        match &outcome {
            RelayOutcome::Forwarded => {
                log_info!("[{}] forwarded to result surface", correlation_id)
            }
            RelayOutcome::FallbackRequested { tab } => {
                log_info!("[{}] inline analysis requested in {}", correlation_id, tab)
            }
            RelayOutcome::Dropped(err) => log_debug!("[{}] dropped: {err}", correlation_id),
        }
        self.set_phase(RelayPhase::Idle).await;

        outcome
    }

    async fn forward_to_surface(&self, envelope: &Envelope) -> Result<(), SentimentError> {
        let launcher = self.launcher.as_ref().ok_or_else(|| {
            SentimentError::RelayUnavailable("host cannot open the result surface".into())
        })?;

        let mut surface = launcher.open_surface().await?;
        if !surface.ready().await {
            return Err(SentimentError::RelayUnavailable(
                "result surface closed before it was ready".into(),
            ));
        }

        match surface
            .prefill()
            .post(envelope.correlation_id, envelope.request.clone())
        {
            Delivery::Posted => Ok(()),
            Delivery::Dropped => Err(SentimentError::RelayUnavailable(
                "result surface stopped listening".into(),
            )),
        }
    }

    async fn request_fallback(&self, envelope: &Envelope) -> RelayOutcome {
        let dropped = RelayOutcome::Dropped(SentimentError::DeliveryDropped {
            kind: MessageKind::InlineAnalyze,
        });

        let Some(tab) = self.tabs.active_tab().await else {
            return dropped;
        };
        let Some(overlay) = tab.overlay else {
            return dropped;
        };

        match overlay.post(envelope.correlation_id, envelope.request.clone()) {
            Delivery::Posted => RelayOutcome::FallbackRequested { tab: tab.id },
            Delivery::Dropped => dropped,
        }
    }

    async fn set_phase(&self, phase: RelayPhase) {
        *self.phase.lock().await = phase;
    }

    /// Drains `SENTIMENT_ANALYZE` messages one at a time.
    pub fn spawn(self, mut inbox: Inbox, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    envelope = inbox.recv() => match envelope {
                        Some(envelope) => {
                            self.handle_analysis_request(envelope).await;
                        }
                        None => break,
                    },
                }
            }
            log_debug!("relay loop stopped");
        })
    }
}
