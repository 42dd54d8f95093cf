//! Host runtime capabilities the contexts depend on. Each one is queried at
//! call time and answers with a typed outcome.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{error::SentimentError, messaging::Mailbox};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

/// A page as seen from the privileged side.
#[derive(Debug, Clone)]
pub struct TabHandle {
    pub id: TabId,
    pub url: String,
    /// `None` when no overlay runs in the page (e.g. browser-internal pages).
    pub overlay: Option<Mailbox>,
}

#[async_trait]
pub trait TabDirectory: Send + Sync {
    /// The focused ordinary page, if any.
    async fn active_tab(&self) -> Option<TabHandle>;
}

#[async_trait]
pub trait ScriptInjector: Send + Sync {
    /// Runs a selection read inside the page and returns the live selection (possibly empty).
    async fn read_selection(&self, tab: TabId) -> Result<String>;
}

/// An opened result surface: where to push prefills, and whether it is ready.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    prefill: Mailbox,
    ready: watch::Receiver<bool>,
}

impl SurfaceHandle {
    pub fn new(prefill: Mailbox, ready: watch::Receiver<bool>) -> Self {
        Self { prefill, ready }
    }

    pub fn prefill(&self) -> &Mailbox {
        &self.prefill
    }

    /// Waits until the surface reports ready. No timeout: a surface that never
    /// answers keeps the caller waiting. Returns false if the surface went away.
    pub async fn ready(&mut self) -> bool {
        self.ready.wait_for(|ready| *ready).await.is_ok()
    }
}

#[async_trait]
pub trait SurfaceLauncher: Send + Sync {
    /// Brings the result surface to the foreground. Fails with
    /// [`SentimentError::RelayUnavailable`] when the host refuses.
    async fn open_surface(&self) -> Result<SurfaceHandle, SentimentError>;
}
