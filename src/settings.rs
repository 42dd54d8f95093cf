use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::api::{EndpointList, DEFAULT_ENDPOINTS, DEFAULT_REQUEST_TIMEOUT, PRODUCTION_ENDPOINT};
use crate::overlay::state::AUTO_HIDE_DELAY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Result surface endpoints, in try order.
    pub endpoints: Vec<String>,
    /// The one endpoint the in-page overlay calls.
    pub inline_endpoint: String,
    pub request_timeout_ms: u64,
    pub auto_hide_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|url| url.to_string()).collect(),
            inline_endpoint: PRODUCTION_ENDPOINT.into(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            auto_hide_ms: AUTO_HIDE_DELAY.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn endpoint_list(&self) -> Result<EndpointList> {
        EndpointList::parse(&self.endpoints).context("invalid result surface endpoints")
    }

    pub fn inline_endpoints(&self) -> Result<EndpointList> {
        EndpointList::parse([&self.inline_endpoint]).context("invalid inline endpoint")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn auto_hide(&self) -> Duration {
        Duration::from_millis(self.auto_hide_ms)
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> Settings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        settings.endpoint_list()?;
        settings.inline_endpoints()?;

        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: Settings = serde_json::from_str(&contents)?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
