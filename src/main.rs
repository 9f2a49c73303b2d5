//! Commute log - infers home/work commutes from location and geofence signals
//!
//! Replays a JSONL stream of location samples, region crossings and manual
//! commands through the commute engine and prints lifecycle notifications as
//! JSON lines on stdout.
//!
//! Module structure:
//! - `domain/` - Core types (Schedule, Endpoint, Commute, inputs)
//! - `io/` - External interfaces (stores, notifications, provider, replay)
//! - `services/` - Business logic (CommuteEngine, LocationFilter)
//! - `infra/` - Infrastructure (Config, Metrics, Clock)

use anyhow::Context;
use clap::Parser;
use commute_log::infra::{Config, Metrics};
use commute_log::io::{
    create_notification_channel, replay_file, replay_reader, CommuteStore, JsonFileStore,
    LoggingProvider,
};
use commute_log::services::{CommuteEngine, LocationFilter, SortOrder};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Commute log - commute detection from location events
#[derive(Parser, Debug)]
#[command(name = "commute-log", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// JSONL file of engine inputs; reads stdin when omitted
    #[arg(short, long)]
    events: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only notifications.
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "commute-log starting");

    let args = Args::parse();

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        store_path = %config.store_path(),
        accuracy_filter_m = %config.accuracy_filter_m(),
        endpoints = %config.endpoints().count(),
        metrics_interval_secs = %config.metrics_interval_secs(),
        "config_loaded"
    );

    // Configured endpoints overwrite stored ones; missing ones are left alone
    let store = JsonFileStore::new(config.store_path());
    for endpoint in config.endpoints() {
        store
            .save_endpoint(endpoint)
            .with_context(|| format!("Failed to seed endpoint {}", endpoint.identifier))?;
    }

    let metrics = Arc::new(Metrics::new());
    let (notifier, mut notification_rx) = create_notification_channel();

    let mut engine = CommuteEngine::new(store, LocationFilter::new(config.accuracy_filter_m()))
        .context("Failed to start commute engine")?
        .with_provider(Box::new(LoggingProvider::new()))
        .with_notifier(notifier)
        .with_metrics(metrics.clone());
    engine.begin_monitoring();

    // Print notifications as JSON lines
    let printer = tokio::spawn(async move {
        while let Some(event) = notification_rx.recv().await {
            info!(
                event = %event.as_str(),
                commute = %event.commute().identifier,
                locations = %event.commute().locations.len(),
                "commute_notification"
            );
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "notification_serialize_failed"),
            }
        }
    });

    // Start metrics reporter (lock-free reads)
    let metrics_interval = config.metrics_interval_secs();
    if metrics_interval > 0 {
        let metrics_clone = metrics.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
            loop {
                interval.tick().await;
                metrics_clone.report().log();
            }
        });
    }

    // Input channel (bounded for backpressure)
    let (input_tx, input_rx) = mpsc::channel(1000);
    let replay = tokio::spawn(async move {
        let result = match args.events {
            Some(path) => replay_file(&path, input_tx).await,
            None => replay_reader(tokio::io::stdin(), "stdin", input_tx).await,
        };
        if let Err(e) = result {
            error!(error = %format!("{e:#}"), "replay_failed");
        }
    });

    info!("commute_engine_started");

    // Run engine - consumes inputs until the replay closes the channel
    tokio::select! {
        _ = engine.run(input_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown_signal_received");
        }
    }
    replay.abort();

    let stored = engine.fetch_commutes(None, SortOrder::Descending)?;
    info!(
        commutes = %stored.len(),
        active = ?engine.active_commute().map(|c| c.identifier.as_str()),
        "commute_store_state"
    );
    metrics.report().log();

    // Dropping the engine closes the notification channel
    drop(engine);
    printer.await.ok();

    info!("commute-log shutdown complete");
    Ok(())
}
