//! # Ghostbus Server
//!
//! Main entry point for the ghost-vehicle detection system. Wires the
//! detection pipeline to a position feed, streams enriched records to
//! WebSocket subscribers, and exposes Prometheus metrics on demand.

mod config;

use crate::config::ServerConfig;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ghostbus_detector::{DetectionPipeline, DisabledRouteMatcher};
use ghostbus_ingest::{IngestLoop, NullSink, SimulatedFeed};
use ghostbus_telemetry::MetricsCollector;
use ghostbus_websocket::BroadcastHub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("Starting Ghostbus Detection Server v0.1.0");

    let config = ServerConfig::from_env();
    info!("Configuration loaded");
    info!("   WebSocket Port: {}", config.ws_port);
    info!("   Feed Interval: {}s", config.feed_interval_seconds);
    info!(
        "   Stale Threshold: {}s",
        config.detector.stale_threshold_seconds
    );
    info!(
        "   Recurring Flag Threshold: {}",
        config.detector.recurring_flag_threshold
    );

    let pipeline = Arc::new(DetectionPipeline::new(
        config.detector.clone(),
        Arc::new(DisabledRouteMatcher),
    ));
    let hub = Arc::new(BroadcastHub::new(config.broadcast_buffer));
    let metrics = Arc::new(MetricsCollector::new()?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // WebSocket fan-out in the background
    let ws_hub = hub.clone();
    let ws_port = config.ws_port;
    let ws_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) = ghostbus_websocket::start_server(ws_hub, ws_port, ws_shutdown).await {
            error!("WebSocket server error: {}", e);
        }
    });

    // Ingest loop drives everything; runs on the main task
    let ingest = IngestLoop::new(
        pipeline,
        hub,
        Arc::new(NullSink),
        metrics,
        Duration::from_secs(config.feed_interval_seconds),
    );
    let feed = SimulatedFeed::new(config.simulated_vehicles);

    info!("Live stream on ws://0.0.0.0:{}", config.ws_port);

    let ingest_shutdown = shutdown_rx.clone();
    let ingest_handle = tokio::spawn(async move { ingest.run(feed, ingest_shutdown).await });

    shutdown_signal().await;
    shutdown_tx.send(true)?;

    ingest_handle.await??;
    info!("Server shutdown complete");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,ghostbus_server=debug,ghostbus_websocket=debug")
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        }
    }
}
