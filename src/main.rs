//! # wattlink
//!
//! Relay server binary: loads settings, wires the store, payment client and
//! relay together, and serves until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use wattlink_payments::PaymentClient;
use wattlink_server::{Relay, ServerConfig, ServerDeps};
use wattlink_settings::WattlinkSettings;
use wattlink_store::{Database, ReadingRepo};
use wattlink_telemetry::TelemetryConfig;

/// Real-time relay between metering devices and dashboards.
#[derive(Parser, Debug)]
#[command(name = "wattlink", version, about)]
struct Cli {
    /// Settings file (defaults to `~/.wattlink/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the SQLite readings database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,
}

impl Cli {
    fn load_settings(&self) -> Result<WattlinkSettings> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(wattlink_settings::settings_path);
        let mut settings = wattlink_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(db_path) = &self.db_path {
            settings.storage.db_path = db_path.clone();
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    let telemetry = wattlink_telemetry::init_telemetry(&TelemetryConfig {
        json: settings.logging.json,
        ..TelemetryConfig::default().with_level_name(&settings.logging.level)
    })
    .context("Failed to initialize telemetry")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting wattlink");

    let db_path = &settings.storage.db_path;
    let db = Database::open(db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

    let deps = ServerDeps {
        relay: Arc::new(Relay::in_memory()),
        readings: ReadingRepo::new(db),
        billing: settings.billing.clone(),
        payments: PaymentClient::from_settings(&settings.payments),
        metrics: telemetry.metrics().cloned(),
    };

    let config = ServerConfig::from_settings(&settings.server);
    let handle = wattlink_server::start(config, deps)
        .await
        .context("Failed to start server")?;
    tracing::info!(port = handle.port, "wattlink ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    handle.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}
