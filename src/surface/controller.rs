use std::sync::Arc;

use log::{info, warn};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    api::SentimentService,
    host::{ScriptInjector, TabDirectory},
    messaging::Inbox,
};

use super::{selection_from_active_tab, SurfaceState, SurfaceStatus};

pub trait SurfaceView: Send + Sync {
    fn render(&self, state: &SurfaceState);
}

/// Detachable result panel: text input, "analyze" and "use page selection"
/// actions, and the prefill entry point used by the relay.
#[derive(Clone)]
pub struct ResultSurface {
    state: Arc<Mutex<SurfaceState>>,
    service: Arc<dyn SentimentService>,
    tabs: Arc<dyn TabDirectory>,
    injector: Arc<dyn ScriptInjector>,
    view: Arc<dyn SurfaceView>,
}

impl ResultSurface {
    pub fn new(
        service: Arc<dyn SentimentService>,
        tabs: Arc<dyn TabDirectory>,
        injector: Arc<dyn ScriptInjector>,
        view: Arc<dyn SurfaceView>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState::default())),
            service,
            tabs,
            injector,
            view,
        }
    }

    pub async fn state(&self) -> SurfaceState {
        self.state.lock().await.clone()
    }

    pub async fn set_input(&self, text: &str) {
        let mut state = self.state.lock().await;
        state.input = text.to_string();
    }

    /// Blank input is rejected locally with no network call.
    pub async fn analyze(&self, text: &str) -> SurfaceStatus {
        if text.trim().is_empty() {
            return self.update(SurfaceState::reject_blank).await;
        }

        self.update(SurfaceState::begin).await;
        match self.service.resolve(text).await {
            Ok(result) => self.update(|state| state.complete(&result)).await,
            Err(err) => {
                warn!("result surface analysis failed: {err}");
                self.update(|state| state.fail(&err)).await
            }
        }
    }

    /// "Analyze" action: submits whatever is in the input field.
    pub async fn analyze_input(&self) -> SurfaceStatus {
        let input = self.state.lock().await.input.clone();
        self.analyze(&input).await
    }

    /// "Use current page selection" action.
    pub async fn use_page_selection(&self) -> SurfaceStatus {
        match selection_from_active_tab(self.tabs.as_ref(), self.injector.as_ref()).await {
            Ok(selection) => {
                if !selection.is_empty() {
                    self.set_input(&selection).await;
                }
                self.analyze_input().await
            }
            Err(err) => self.update(|state| state.fail(&err)).await,
        }
    }

    /// Relay push: populate the input and submit right away.
    pub async fn prefill(&self, text: &str) -> SurfaceStatus {
        self.set_input(text).await;
        self.analyze(text).await
    }

    async fn update<F>(&self, apply: F) -> SurfaceStatus
    where
        F: FnOnce(&mut SurfaceState),
    {
        let snapshot = {
            let mut state = self.state.lock().await;
            apply(&mut state);
            state.clone()
        };
        self.view.render(&snapshot);
        snapshot.status
    }

    /// Signals readiness, then drains `POPUP_PREFILL` messages in order.
    pub fn spawn(
        self,
        mut prefills: Inbox,
        ready: watch::Sender<bool>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let _ = ready.send(true);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    envelope = prefills.recv() => match envelope {
                        Some(envelope) => {
                            info!("[{}] prefill received", envelope.correlation_id);
                            self.prefill(&envelope.request.text).await;
                        }
                        None => break,
                    },
                }
            }
            let _ = ready.send(false);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex as StdMutex,
    };

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::SentimentError,
        host::{TabHandle, TabId},
        messaging::{channel, MessageKind},
        models::{AnalysisRequest, AnalysisResult},
        surface::state::{BLANK_INPUT_MESSAGE, DONE_MESSAGE},
    };

    struct FakeService {
        result: Result<AnalysisResult, SentimentError>,
        seen: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl SentimentService for FakeService {
        async fn resolve(&self, text: &str) -> Result<AnalysisResult, SentimentError> {
            self.seen.lock().expect("seen lock").push(text.to_string());
            self.result.clone()
        }
    }

    struct FakeTabs {
        url: Option<&'static str>,
    }

    #[async_trait]
    impl TabDirectory for FakeTabs {
        async fn active_tab(&self) -> Option<TabHandle> {
            self.url.map(|url| TabHandle {
                id: TabId(3),
                url: url.to_string(),
                overlay: None,
            })
        }
    }

    struct FakeInjector {
        selection: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScriptInjector for FakeInjector {
        async fn read_selection(&self, _tab: TabId) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.selection
                .map(str::to_string)
                .ok_or_else(|| anyhow!("cannot access contents of the page"))
        }
    }

    #[derive(Default)]
    struct RecordingView {
        states: StdMutex<Vec<SurfaceState>>,
    }

    impl SurfaceView for RecordingView {
        fn render(&self, state: &SurfaceState) {
            self.states.lock().expect("view lock").push(state.clone());
        }
    }

    struct Harness {
        service: Arc<FakeService>,
        injector: Arc<FakeInjector>,
        view: Arc<RecordingView>,
        surface: ResultSurface,
    }

    fn harness(
        result: Result<AnalysisResult, SentimentError>,
        url: Option<&'static str>,
        selection: Option<&'static str>,
    ) -> Harness {
        let service = Arc::new(FakeService {
            result,
            seen: StdMutex::new(Vec::new()),
        });
        let injector = Arc::new(FakeInjector {
            selection,
            calls: AtomicUsize::new(0),
        });
        let view = Arc::new(RecordingView::default());
        let surface = ResultSurface::new(
            service.clone(),
            Arc::new(FakeTabs { url }),
            injector.clone(),
            view.clone(),
        );
        Harness {
            service,
            injector,
            view,
            surface,
        }
    }

    fn positive() -> Result<AnalysisResult, SentimentError> {
        Ok(AnalysisResult::new("positive", 0.6, 0.9))
    }

    fn calls(h: &Harness) -> Vec<String> {
        h.service.seen.lock().expect("seen lock").clone()
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_a_request() {
        let h = harness(positive(), None, None);
        assert_eq!(h.surface.analyze(" \n\t ").await, SurfaceStatus::Failed);

        let state = h.surface.state().await;
        assert_eq!(state.status_message, BLANK_INPUT_MESSAGE);
        assert!(state.is_error);
        assert!(calls(&h).is_empty());
    }

    #[tokio::test]
    async fn prefill_populates_input_and_submits() {
        let h = harness(positive(), None, None);
        assert_eq!(h.surface.prefill("great product").await, SurfaceStatus::Done);

        let state = h.surface.state().await;
        assert_eq!(state.input, "great product");
        assert_eq!(state.status_message, DONE_MESSAGE);
        assert_eq!(
            state.result.map(|r| r.summary()).as_deref(),
            Some("positive / 0.600 / 0.900")
        );
        assert_eq!(calls(&h), vec!["great product".to_string()]);
        let statuses: Vec<SurfaceStatus> = h
            .view
            .states
            .lock()
            .expect("view lock")
            .iter()
            .map(|s| s.status)
            .collect();
        assert_eq!(statuses, vec![SurfaceStatus::Analyzing, SurfaceStatus::Done]);
    }

    #[tokio::test]
    async fn prefill_with_unreachable_service_renders_error() {
        let h = harness(
            Err(SentimentError::ServiceUnreachable { attempts: 3 }),
            None,
            None,
        );
        assert_eq!(h.surface.prefill("great product").await, SurfaceStatus::Failed);

        let state = h.surface.state().await;
        assert_eq!(state.input, "great product");
        assert_eq!(state.status_message, "Could not reach the local API.");
        assert!(state.is_error);
        assert!(state.result.is_none());
    }

    #[tokio::test]
    async fn restricted_page_fails_before_any_injection() {
        let h = harness(positive(), Some("chrome://extensions"), Some("secret"));
        assert_eq!(h.surface.use_page_selection().await, SurfaceStatus::Failed);

        let state = h.surface.state().await;
        assert_eq!(
            state.status_message,
            "Cannot access chrome:// or similar pages. Open a normal webpage."
        );
        assert_eq!(h.injector.calls.load(Ordering::SeqCst), 0);
        assert!(calls(&h).is_empty());
    }

    #[tokio::test]
    async fn injection_failure_is_reported() {
        let h = harness(positive(), Some("https://bank.example/"), None);
        assert_eq!(h.surface.use_page_selection().await, SurfaceStatus::Failed);
        assert_eq!(
            h.surface.state().await.status_message,
            "Unable to read selection on this page."
        );
        assert_eq!(h.injector.calls.load(Ordering::SeqCst), 1);
        assert!(calls(&h).is_empty());
    }

    #[tokio::test]
    async fn page_selection_replaces_input_and_submits() {
        let h = harness(positive(), Some("https://news.example/"), Some("What a day"));
        h.surface.set_input("typed earlier").await;
        assert_eq!(h.surface.use_page_selection().await, SurfaceStatus::Done);
        assert_eq!(h.surface.state().await.input, "What a day");
        assert_eq!(calls(&h), vec!["What a day".to_string()]);
    }

    #[tokio::test]
    async fn empty_page_selection_keeps_typed_input() {
        let h = harness(positive(), Some("https://news.example/"), Some(""));
        h.surface.set_input("typed earlier").await;
        assert_eq!(h.surface.use_page_selection().await, SurfaceStatus::Done);
        assert_eq!(calls(&h), vec!["typed earlier".to_string()]);

        let h = harness(positive(), None, None);
        assert_eq!(h.surface.use_page_selection().await, SurfaceStatus::Failed);
        assert_eq!(h.surface.state().await.status_message, BLANK_INPUT_MESSAGE);
    }

    #[tokio::test]
    async fn spawned_surface_reports_ready_and_handles_prefills() {
        let h = harness(positive(), None, None);
        let (mailbox, inbox) = channel(MessageKind::PopupPrefill);
        let (ready_tx, mut ready_rx) = watch::channel(false);
        let shutdown = CancellationToken::new();
        let handle = h.surface.clone().spawn(inbox, ready_tx, shutdown.clone());

        ready_rx.wait_for(|ready| *ready).await.expect("ready");
        mailbox.post_new(AnalysisRequest::new("great product"));

        let mut rendered = None;
        for _ in 0..50 {
            let state = h.surface.state().await;
            if state.status == SurfaceStatus::Done {
                rendered = state.result;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(
            rendered.map(|r| r.summary()).as_deref(),
            Some("positive / 0.600 / 0.900")
        );

        shutdown.cancel();
        handle.await.expect("surface loop joins");
    }
}
