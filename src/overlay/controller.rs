use std::{
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use log::info;
use tokio::{
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    api::SentimentService,
    messaging::{Delivery, Envelope, Inbox, Mailbox},
    models::{format_score, AnalysisRequest, AnalysisResult, Point},
};

use super::{
    state::FAILED_TEXT, ClickTarget, OverlayFrame, OverlayModel, OverlayState, OverlayView,
    PageContext, PageEvent,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug)]
pub enum TriggerOutcome {
    /// No trigger on screen or nothing to analyze.
    Ignored,
    /// Handed to the relay under this correlation id.
    Dispatched(Uuid),
    /// Relay unreachable; analysis runs in the page.
    Inline(JoinHandle<String>),
}

/// In-page controller: tracks the selection, owns the trigger, and runs the
/// inline analysis when the relay cannot.
#[derive(Clone)]
pub struct OverlayController {
    model: Arc<Mutex<OverlayModel>>,
    page: Arc<dyn PageContext>,
    view: Arc<dyn OverlayView>,
    relay: Option<Mailbox>,
    service: Arc<dyn SentimentService>,
    auto_hide_delay: Duration,
    hide_timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// One inline analysis at a time.
    inline_gate: Arc<Mutex<()>>,
    /// Completion signal of the most recently queued inline analysis. Each new
    /// one waits on its predecessor, so they run in arrival order.
    inline_tail: Arc<StdMutex<Option<oneshot::Receiver<()>>>>,
}

impl OverlayController {
    pub fn new(
        page: Arc<dyn PageContext>,
        view: Arc<dyn OverlayView>,
        relay: Option<Mailbox>,
        service: Arc<dyn SentimentService>,
        auto_hide_delay: Duration,
    ) -> Self {
        Self {
            model: Arc::new(Mutex::new(OverlayModel::new())),
            page,
            view,
            relay,
            service,
            auto_hide_delay,
            hide_timer: Arc::new(Mutex::new(None)),
            inline_gate: Arc::new(Mutex::new(())),
            inline_tail: Arc::new(StdMutex::new(None)),
        }
    }

    pub async fn state(&self) -> OverlayState {
        self.model.lock().await.state()
    }

    pub async fn frame(&self) -> OverlayFrame {
        self.model.lock().await.frame()
    }

    pub async fn on_selection_changed(&self) {
        let live = self.page.selection();
        self.observe(&live.text, live.anchor).await;
    }

    /// Covers selections that never fire a selection change (re-selecting the
    /// same text). Anchors at the pointer.
    pub async fn on_pointer_up(&self, x: f64, y: f64) {
        let live = self.page.selection();
        if live.usable_text().is_none() {
            return;
        }
        self.observe(&live.text, Some(Point::new(x, y))).await;
    }

    pub async fn on_outside_click(&self, target: ClickTarget) {
        let selection_active = !self.page.selection().text.trim().is_empty();
        let frame = {
            let mut model = self.model.lock().await;
            if !model.observe_outside_click(target == ClickTarget::Overlay, selection_active) {
                return;
            }
            model.frame()
        };
        self.cancel_auto_hide().await;
        self.view.render(&frame);
    }

    pub async fn on_trigger_activated(&self) -> TriggerOutcome {
        let live = self.page.selection();
        let Some(text) = self.model.lock().await.trigger_text(&live) else {
            return TriggerOutcome::Ignored;
        };

        match &self.relay {
            Some(relay) => {
                let (correlation_id, delivery) = relay.post_new(AnalysisRequest::new(text.clone()));
                if delivery == Delivery::Posted {
                    log_debug!("[{}] analysis request handed to relay", correlation_id);
                    return TriggerOutcome::Dispatched(correlation_id);
                }
                log_warn!("relay channel closed; analyzing in page");
            }
            None => {
                log_info!("no relay channel available; analyzing in page");
            }
        }

        TriggerOutcome::Inline(self.spawn_inline(text))
    }

    /// The relay could not open the result surface and asked us to handle it.
    pub fn on_relay_fallback_message(&self, envelope: Envelope) -> JoinHandle<String> {
        info!(
            "[{}] relay fallback received, analyzing in page",
            envelope.correlation_id
        );
        self.spawn_inline(envelope.request.text)
    }

    /// Queues behind the previous inline request before spawning, so the order
    /// is fixed at call time rather than by task scheduling.
    fn spawn_inline(&self, text: String) -> JoinHandle<String> {
        let (done_tx, done_rx) = oneshot::channel();
        let previous = {
            let mut tail = match self.inline_tail.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            tail.replace(done_rx)
        };

        let controller = self.clone();
        tokio::spawn(async move {
            if let Some(previous) = previous {
                // A cancelled predecessor drops its sender; that also releases us.
                let _ = previous.await;
            }
            let rendered = controller.inline_analyze(&text).await;
            let _ = done_tx.send(());
            rendered
        })
    }

    /// Runs one request against the service and renders the outcome in the
    /// feedback bubble. Failures are rendered, never retried. Returns the
    /// rendered text.
    pub async fn inline_analyze(&self, text: &str) -> String {
        let _turn = self.inline_gate.lock().await;
        self.cancel_auto_hide().await;

        let frame = {
            let mut model = self.model.lock().await;
            model.begin_analysis();
            model.frame()
        };
        self.view.render(&frame);

        let feedback = match self.service.resolve(text).await {
            Ok(result) => inline_summary(&result),
            Err(err) => {
                log_warn!("inline analysis failed: {err}");
                FAILED_TEXT.to_string()
            }
        };

        let (generation, frame) = {
            let mut model = self.model.lock().await;
            let generation = model.finish_analysis(feedback.clone());
            (generation, model.frame())
        };
        self.view.render(&frame);
        self.schedule_auto_hide(generation).await;

        feedback
    }

    async fn observe(&self, text: &str, anchor: Option<Point>) {
        let (changed, frame) = {
            let mut model = self.model.lock().await;
            let changed = model.observe_selection(text, anchor);
            (changed, model.frame())
        };

        if changed {
            if frame.state != OverlayState::Analyzing {
                self.cancel_auto_hide().await;
            }
            self.view.render(&frame);
        }
    }

    async fn schedule_auto_hide(&self, generation: u64) {
        let mut timer_guard = self.hide_timer.lock().await;
        if let Some(handle) = timer_guard.take() {
            handle.abort();
        }

        let model = self.model.clone();
        let view = self.view.clone();
        let delay = self.auto_hide_delay;

        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let frame = {
                let mut guard = model.lock().await;
                if !guard.auto_hide(generation) {
                    return;
                }
                guard.frame()
            };
            view.render(&frame);
        });

        *timer_guard = Some(handle);
    }

    async fn cancel_auto_hide(&self) {
        if let Some(handle) = self.hide_timer.lock().await.take() {
            handle.abort();
        }
    }

    async fn handle_page_event(&self, event: PageEvent) {
        match event {
            PageEvent::SelectionChanged => self.on_selection_changed().await,
            PageEvent::PointerUp { x, y } => self.on_pointer_up(x, y).await,
            PageEvent::PointerDown(target) => self.on_outside_click(target).await,
            PageEvent::TriggerActivated => {
                let _ = self.on_trigger_activated().await;
            }
        }
    }

    /// Event loop for one page: page events and relay fallbacks, one at a time
    /// in arrival order.
    pub fn spawn(
        self,
        mut events: mpsc::UnboundedReceiver<PageEvent>,
        mut fallback: Inbox,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut events_open = true;
            let mut fallback_open = true;

            while events_open || fallback_open {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv(), if events_open => match event {
                        Some(event) => self.handle_page_event(event).await,
                        None => events_open = false,
                    },
                    envelope = fallback.recv(), if fallback_open => match envelope {
                        Some(envelope) => {
                            let _ = self.on_relay_fallback_message(envelope);
                        }
                        None => fallback_open = false,
                    },
                }
            }

            log_debug!("overlay loop stopped");
            self.cancel_auto_hide().await;
        })
    }
}

fn inline_summary(result: &AnalysisResult) -> String {
    format!(
        "Sentiment: {} | Polarity: {}",
        result.sentiment_label(),
        format_score(result.polarity)
    )
}
