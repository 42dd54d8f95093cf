//! In-process host: runs the overlay, relay and result surface as tokio tasks
//! wired together with message channels. Used by the CLI and the integration
//! tests; a browser binding would provide the same capabilities.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex as StdMutex, MutexGuard},
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use log::{error, info};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    api::{EndpointResolver, SentimentService},
    error::SentimentError,
    messaging::{channel, Mailbox, MessageKind},
    models::{LiveSelection, Point},
    overlay::{state::AUTO_HIDE_DELAY, ClickTarget, OverlayController, PageContext, PageEvent},
    relay::Relay,
    settings::Settings,
    surface::{classify_address, AddressClass, ResultSurface},
};

use super::{
    events::{ChannelOverlayView, ChannelSurfaceView},
    HostEvent, ScriptInjector, SurfaceHandle, SurfaceLauncher, TabDirectory, TabHandle, TabId,
};

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// What the host does when asked to open the result surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSupport {
    Available,
    /// The capability exists but every open attempt fails.
    Failing,
    /// The capability does not exist at all.
    Absent,
}

#[derive(Debug, Clone)]
pub struct HostOptions {
    pub surface: SurfaceSupport,
    /// Whether pages get a channel to the relay.
    pub relay_channel: bool,
    pub auto_hide: Duration,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            surface: SurfaceSupport::Available,
            relay_channel: true,
            auto_hide: AUTO_HIDE_DELAY,
        }
    }
}

/// Service used by the result surface (full endpoint list) and by overlays
/// (single endpoint).
#[derive(Clone)]
pub struct HostServices {
    pub surface: Arc<dyn SentimentService>,
    pub inline: Arc<dyn SentimentService>,
}

impl HostServices {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = settings.request_timeout();
        Ok(Self {
            surface: Arc::new(EndpointResolver::new(settings.endpoint_list()?, timeout)?),
            inline: Arc::new(EndpointResolver::new(settings.inline_endpoints()?, timeout)?),
        })
    }
}

struct StaticPage {
    selection: StdMutex<LiveSelection>,
}

impl PageContext for StaticPage {
    fn selection(&self) -> LiveSelection {
        lock(&self.selection).clone()
    }
}

struct TabEntry {
    url: String,
    page: Arc<StaticPage>,
    overlay: Option<Mailbox>,
}

#[derive(Default)]
struct RegistryInner {
    tabs: BTreeMap<TabId, TabEntry>,
    active: Option<TabId>,
    next_id: u32,
}

#[derive(Default)]
struct TabRegistry {
    inner: StdMutex<RegistryInner>,
}

#[async_trait]
impl TabDirectory for TabRegistry {
    async fn active_tab(&self) -> Option<TabHandle> {
        let inner = lock(&self.inner);
        let id = inner.active?;
        inner.tabs.get(&id).map(|entry| TabHandle {
            id,
            url: entry.url.clone(),
            overlay: entry.overlay.clone(),
        })
    }
}

#[async_trait]
impl ScriptInjector for TabRegistry {
    async fn read_selection(&self, tab: TabId) -> Result<String> {
        let inner = lock(&self.inner);
        let entry = inner
            .tabs
            .get(&tab)
            .ok_or_else(|| anyhow!("{tab} no longer exists"))?;
        if let AddressClass::Restricted { scheme } = classify_address(&entry.url) {
            bail!("scripts cannot run on {scheme} pages");
        }
        Ok(entry.page.selection().text)
    }
}

/// Drives one simulated page: changes its selection and fires page events.
#[derive(Clone)]
pub struct PageHandle {
    id: TabId,
    page: Arc<StaticPage>,
    events: mpsc::UnboundedSender<PageEvent>,
}

impl PageHandle {
    pub fn id(&self) -> TabId {
        self.id
    }

    fn set_selection(&self, selection: LiveSelection) {
        *lock(&self.page.selection) = selection;
    }

    fn fire(&self, event: PageEvent) {
        // Pages without an overlay have nobody listening.
        let _ = self.events.send(event);
    }

    pub fn select(&self, text: &str, anchor: Option<Point>) {
        self.set_selection(LiveSelection::new(text, anchor));
        self.fire(PageEvent::SelectionChanged);
    }

    /// Selection made by dragging, released at `(x, y)`.
    pub fn select_with_pointer(&self, text: &str, x: f64, y: f64) {
        self.set_selection(LiveSelection::new(text, None));
        self.fire(PageEvent::PointerUp { x, y });
    }

    pub fn collapse_selection(&self) {
        self.set_selection(LiveSelection::empty());
        self.fire(PageEvent::SelectionChanged);
    }

    pub fn click(&self, target: ClickTarget) {
        self.fire(PageEvent::PointerDown(target));
    }

    pub fn activate_trigger(&self) {
        self.fire(PageEvent::TriggerActivated);
    }
}

struct OpenSurface {
    surface: ResultSurface,
    handle: SurfaceHandle,
    task: JoinHandle<()>,
}

struct LocalSurfaceLauncher {
    failing: bool,
    service: Arc<dyn SentimentService>,
    tabs: Arc<TabRegistry>,
    events: mpsc::UnboundedSender<HostEvent>,
    shutdown: CancellationToken,
    open: Mutex<Option<OpenSurface>>,
}

impl LocalSurfaceLauncher {
    async fn open_or_focus(&self) -> Result<(ResultSurface, SurfaceHandle), SentimentError> {
        if self.failing {
            return Err(SentimentError::RelayUnavailable(
                "host refused to open the result surface".into(),
            ));
        }

        let mut guard = self.open.lock().await;
        if let Some(open) = guard.as_ref() {
            if !open.handle.prefill().is_closed() {
                return Ok((open.surface.clone(), open.handle.clone()));
            }
        }

        let (prefill, inbox) = channel(MessageKind::PopupPrefill);
        let (ready_tx, ready_rx) = watch::channel(false);
        let surface = ResultSurface::new(
            self.service.clone(),
            self.tabs.clone(),
            self.tabs.clone(),
            Arc::new(ChannelSurfaceView {
                events: self.events.clone(),
            }),
        );
        let task = surface
            .clone()
            .spawn(inbox, ready_tx, self.shutdown.child_token());
        let handle = SurfaceHandle::new(prefill, ready_rx);
        info!("result surface opened");

        *guard = Some(OpenSurface {
            surface: surface.clone(),
            handle: handle.clone(),
            task,
        });
        Ok((surface, handle))
    }

    async fn close(&self) -> Option<JoinHandle<()>> {
        self.open.lock().await.take().map(|open| open.task)
    }
}

#[async_trait]
impl SurfaceLauncher for LocalSurfaceLauncher {
    async fn open_surface(&self) -> Result<SurfaceHandle, SentimentError> {
        self.open_or_focus().await.map(|(_, handle)| handle)
    }
}

pub struct ExtensionHost {
    tabs: Arc<TabRegistry>,
    relay: Option<Mailbox>,
    launcher: Option<Arc<LocalSurfaceLauncher>>,
    inline_service: Arc<dyn SentimentService>,
    events: mpsc::UnboundedSender<HostEvent>,
    shutdown: CancellationToken,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    auto_hide: Duration,
}

impl ExtensionHost {
    /// Starts the relay loop. Must be called from within a tokio runtime.
    pub fn start(
        services: HostServices,
        options: HostOptions,
    ) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let tabs = Arc::new(TabRegistry::default());

        let launcher = match options.surface {
            SurfaceSupport::Absent => None,
            SurfaceSupport::Available | SurfaceSupport::Failing => {
                Some(Arc::new(LocalSurfaceLauncher {
                    failing: options.surface == SurfaceSupport::Failing,
                    service: services.surface.clone(),
                    tabs: tabs.clone(),
                    events: events_tx.clone(),
                    shutdown: shutdown.clone(),
                    open: Mutex::new(None),
                }))
            }
        };

        let mut tasks = Vec::new();
        let relay = if options.relay_channel {
            let (mailbox, inbox) = channel(MessageKind::SentimentAnalyze);
            let relay = Relay::new(
                launcher
                    .clone()
                    .map(|launcher| launcher as Arc<dyn SurfaceLauncher>),
                tabs.clone(),
            );
            tasks.push(relay.spawn(inbox, shutdown.child_token()));
            Some(mailbox)
        } else {
            None
        };

        let host = Self {
            tabs,
            relay,
            launcher,
            inline_service: services.inline,
            events: events_tx,
            shutdown,
            tasks: StdMutex::new(tasks),
            auto_hide: options.auto_hide,
        };
        (host, events_rx)
    }

    pub fn from_settings(
        settings: &Settings,
        options: HostOptions,
    ) -> Result<(Self, mpsc::UnboundedReceiver<HostEvent>)> {
        let services = HostServices::from_settings(settings)?;
        Ok(Self::start(
            services,
            HostOptions {
                auto_hide: settings.auto_hide(),
                ..options
            },
        ))
    }

    /// Opens a page and focuses it. Ordinary pages get an overlay; browser-internal
    /// pages get none.
    pub fn open_tab(&self, url: &str) -> PageHandle {
        let page = Arc::new(StaticPage {
            selection: StdMutex::new(LiveSelection::empty()),
        });
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut inner = lock(&self.tabs.inner);
        inner.next_id += 1;
        let id = TabId(inner.next_id);

        let overlay = match classify_address(url) {
            AddressClass::Restricted { scheme } => {
                info!("{id} opened on {scheme} page; no overlay injected");
                None
            }
            AddressClass::Scriptable => {
                let (mailbox, inbox) = channel(MessageKind::InlineAnalyze);
                let controller = OverlayController::new(
                    page.clone(),
                    Arc::new(ChannelOverlayView {
                        tab: id,
                        events: self.events.clone(),
                    }),
                    self.relay.clone(),
                    self.inline_service.clone(),
                    self.auto_hide,
                );
                let task = controller.spawn(events_rx, inbox, self.shutdown.child_token());
                lock(&self.tasks).push(task);
                Some(mailbox)
            }
        };

        inner.tabs.insert(
            id,
            TabEntry {
                url: url.to_string(),
                page: page.clone(),
                overlay,
            },
        );
        inner.active = Some(id);

        PageHandle {
            id,
            page,
            events: events_tx,
        }
    }

    pub fn activate_tab(&self, id: TabId) -> bool {
        let mut inner = lock(&self.tabs.inner);
        if inner.tabs.contains_key(&id) {
            inner.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Leaves no tab focused (e.g. the browser window lost focus).
    pub fn clear_active_tab(&self) {
        lock(&self.tabs.inner).active = None;
    }

    /// Opens the result surface directly, as a user clicking the toolbar would.
    pub async fn open_surface(&self) -> Result<ResultSurface, SentimentError> {
        let launcher = self.launcher.as_ref().ok_or_else(|| {
            SentimentError::RelayUnavailable("host cannot open the result surface".into())
        })?;
        launcher
            .open_or_focus()
            .await
            .map(|(surface, _)| surface)
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();

        let mut handles = std::mem::take(&mut *lock(&self.tasks));
        if let Some(launcher) = &self.launcher {
            handles.extend(launcher.close().await);
        }

        for handle in handles {
            if let Err(err) = handle.await {
                error!("context task failed to join: {err}");
            }
        }
    }
}
