pub mod api;
pub mod cli;
pub mod error;
pub mod host;
pub mod messaging;
pub mod models;
pub mod overlay;
pub mod relay;
pub mod settings;
pub mod surface;
mod utils;

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio::sync::mpsc;

use cli::Cli;
use host::{ExtensionHost, HostEvent, HostOptions};
use models::Point;
use settings::{Settings, SettingsStore};

/// Where the simulated selection ends on the page.
const SELECTION_ANCHOR: Point = Point { x: 120.0, y: 80.0 };

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => SettingsStore::new(path.clone())?.settings(),
        None => Settings::default(),
    };
    if !cli.endpoints.is_empty() {
        settings.endpoints = cli.endpoints.clone();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(analyze_selection(cli, settings))
}

async fn analyze_selection(cli: Cli, settings: Settings) -> Result<()> {
    info!("sentilens starting up...");

    let options = HostOptions {
        surface: cli.surface_support(),
        ..HostOptions::default()
    };
    let (host, mut events) = ExtensionHost::from_settings(&settings, options)?;

    let page = host.open_tab(&cli.page_url);
    page.select(&cli.text, Some(SELECTION_ANCHOR));

    if cli.from_page {
        let surface = host.open_surface().await?;
        surface.use_page_selection().await;
    } else {
        page.activate_trigger();
    }

    let waited = tokio::time::timeout(
        Duration::from_secs(cli.wait_secs),
        next_final_rendering(&mut events),
    )
    .await;

    let outcome = match waited {
        Ok(Some(rendering)) => {
            println!("{rendering}");
            Ok(())
        }
        Ok(None) => Err(anyhow!("host stopped before anything was rendered")),
        Err(_) => {
            warn!(
                "nothing rendered within {}s; the request was dropped or is still pending",
                cli.wait_secs
            );
            Ok(())
        }
    };

    host.shutdown().await;
    outcome
}

async fn next_final_rendering(events: &mut mpsc::UnboundedReceiver<HostEvent>) -> Option<String> {
    while let Some(event) = events.recv().await {
        if let Some(rendering) = event.final_rendering() {
            return Some(rendering);
        }
    }
    None
}

