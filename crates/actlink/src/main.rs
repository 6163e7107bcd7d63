//! # actlink
//!
//! Standalone tracker client. Connects to ACT/IINACT with the configured
//! transport, keeps the encounter history, and logs status changes and each
//! recorded encounter until Ctrl-C.

#![deny(unsafe_code)]

mod report;

use std::path::PathBuf;
use std::time::Duration;

use actlink_client::{AutoEndPolicy, ClientSlot, HostServices, ReconnectPolicy};
use actlink_core::TransportKind;
use actlink_core::logging::{init_json_subscriber, init_subscriber};
use actlink_settings::{ActLinkSettings, load_settings_from_path, settings_path};
use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::time::MissedTickBehavior;

use crate::report::Reporter;

/// ActLink combat tracker client.
#[derive(Parser, Debug)]
#[command(name = "actlink", about = "ACT/IINACT combat tracker client")]
struct Cli {
    /// Settings file (defaults to `~/.actlink/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Transport to use (overrides settings): `stream` or `callback`.
    #[arg(long)]
    transport: Option<TransportKind>,

    /// WebSocket address (overrides settings).
    #[arg(long)]
    address: Option<String>,

    /// Policy tick interval in milliseconds.
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Report the player as out of combat, so live snapshots are ignored.
    #[arg(long)]
    assume_out_of_combat: bool,

    /// Record metrics and print them in Prometheus text format on exit.
    #[arg(long)]
    metrics: bool,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut ActLinkSettings) {
        if let Some(kind) = self.transport {
            settings.tracker.transport = kind;
        }
        if let Some(address) = &self.address {
            settings.tracker.socket_address.clone_from(address);
        }
        settings.validate();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.settings.clone().unwrap_or_else(settings_path);
    let loaded = load_settings_from_path(&path);
    let mut settings = loaded.as_ref().cloned().unwrap_or_default();
    if settings.logging.json {
        init_json_subscriber(&settings.logging.level);
    } else {
        init_subscriber(&settings.logging.level);
    }
    if let Err(e) = &loaded {
        tracing::warn!(path = %path.display(), error = %e, "failed to load settings, using defaults");
    }
    cli.apply_overrides(&mut settings);

    let metrics = if cli.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install metrics recorder")?,
        )
    } else {
        None
    };

    let tracker = settings.tracker;
    tracing::info!(
        transport = %tracker.transport,
        address = %tracker.socket_address,
        history = tracker.encounter_history_size,
        "starting actlink"
    );

    let mut slot = ClientSlot::new(HostServices::standalone(!cli.assume_out_of_combat));
    slot.replace(&tracker).await.start();

    let mut reconnect = ReconnectPolicy::new(&tracker);
    let mut auto_end = AutoEndPolicy::new(&tracker);
    let mut reporter = Reporter::default();

    let mut ticker = tokio::time::interval(Duration::from_millis(cli.tick_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                }
                break;
            }
            _ = ticker.tick() => {
                let Some(client) = slot.current() else { break };
                let _ = reconnect.tick(client).await;
                let _ = auto_end.tick(client);
                reporter.observe(client);
            }
        }
    }

    tracing::info!("Shutting down...");
    slot.dispose().await;
    if let Some(handle) = metrics {
        println!("{}", handle.render());
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
