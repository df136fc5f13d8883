//! Receipt points service
//!
//! Accepts purchase receipts over HTTP, scores them with the reward rules,
//! and serves the points back by receipt id. State is in memory only.
//!
//! Module structure:
//! - `domain/` - Receipt types and validation
//! - `services/` - Points rules and the receipt store
//! - `io/` - HTTP API and Prometheus formatting
//! - `infra/` - Config and metrics

use clap::Parser;
use receipt_points::infra::{Config, LogFormat, Metrics};
use receipt_points::io::AppState;
use receipt_points::services::ReceiptStore;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Receipt points service
#[derive(Parser, Debug)]
#[command(name = "receipt-points", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

/// Initialize structured logging with configurable level via RUST_LOG env var
/// Default: INFO, use RUST_LOG=debug for per-receipt scoring breakdowns
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref());

    init_logging(config.log_format());
    info!("receipt-points starting");

    info!(
        config_file = %config.config_file(),
        listen_addr = %config.listen_addr(),
        log_format = ?config.log_format(),
        metrics_enabled = %config.metrics_enabled(),
        metrics_interval_secs = %config.metrics_interval_secs(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let store = Arc::new(ReceiptStore::new());
    let metrics = Arc::new(Metrics::new());

    // Periodic metrics reporter (lock-free reads, resets period counters)
    let metrics_interval = config.metrics_interval_secs();
    if config.metrics_enabled() && metrics_interval > 0 {
        let reporter_metrics = metrics.clone();
        let reporter_store = store.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                reporter_metrics.report(reporter_store.len()).log();
            }
        });
    }

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let state =
        AppState::new(store.clone(), metrics).with_metrics_enabled(config.metrics_enabled());
    receipt_points::io::start_server(&config.listen_addr(), state, shutdown_rx).await?;

    info!(stored_receipts = %store.len(), "receipt-points shutdown complete");
    Ok(())
}
