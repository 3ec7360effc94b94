//! # Ghostbus Telemetry - Metrics & Observability
//!
//! Prometheus metrics for the ghost-vehicle detection system:
//! - Ingestion throughput and rejected samples
//! - Detection outcomes and latency
//! - Live subscriber connections and fan-out volume
//! - Persistence sink failures

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use tracing::info;

/// Metrics collector for the detection system
pub struct MetricsCollector {
    registry: Registry,

    // Ingestion metrics
    samples_processed: IntCounter,
    samples_invalid: IntCounter,
    detection_duration: Histogram,

    // Detection metrics
    ghosts_flagged: IntCounter,
    recurring_vehicles: IntGauge,
    tracked_vehicles: IntGauge,

    // Fan-out metrics
    ws_connections: IntGauge,
    ws_messages_sent: IntCounter,
    ws_clients_dropped: IntCounter,

    // Persistence metrics
    sink_failures: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let samples_processed = IntCounter::new(
            "ghostbus_samples_processed_total",
            "Position samples run through the detection pipeline",
        )?;
        registry.register(Box::new(samples_processed.clone()))?;

        let samples_invalid = IntCounter::new(
            "ghostbus_samples_invalid_total",
            "Samples rejected at the pipeline boundary",
        )?;
        registry.register(Box::new(samples_invalid.clone()))?;

        let detection_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ghostbus_detection_duration_seconds",
                "Per-sample detection pipeline latency",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(detection_duration.clone()))?;

        let ghosts_flagged = IntCounter::new(
            "ghostbus_ghosts_flagged_total",
            "Samples flagged as ghost vehicles",
        )?;
        registry.register(Box::new(ghosts_flagged.clone()))?;

        let recurring_vehicles = IntGauge::new(
            "ghostbus_recurring_vehicles",
            "Vehicles currently marked as recurring ghosts",
        )?;
        registry.register(Box::new(recurring_vehicles.clone()))?;

        let tracked_vehicles = IntGauge::new(
            "ghostbus_tracked_vehicles",
            "Vehicles with a live history window",
        )?;
        registry.register(Box::new(tracked_vehicles.clone()))?;

        let ws_connections = IntGauge::new(
            "ghostbus_ws_connections",
            "Active WebSocket subscriber connections",
        )?;
        registry.register(Box::new(ws_connections.clone()))?;

        let ws_messages_sent = IntCounter::new(
            "ghostbus_ws_messages_sent_total",
            "Records handed to subscriber buffers",
        )?;
        registry.register(Box::new(ws_messages_sent.clone()))?;

        let ws_clients_dropped = IntCounter::new(
            "ghostbus_ws_clients_dropped_total",
            "Subscribers disconnected for falling behind",
        )?;
        registry.register(Box::new(ws_clients_dropped.clone()))?;

        let sink_failures = IntCounter::new(
            "ghostbus_sink_failures_total",
            "Persistence sink errors (logged and swallowed)",
        )?;
        registry.register(Box::new(sink_failures.clone()))?;

        info!("Metrics collector initialized");

        Ok(Self {
            registry,
            samples_processed,
            samples_invalid,
            detection_duration,
            ghosts_flagged,
            recurring_vehicles,
            tracked_vehicles,
            ws_connections,
            ws_messages_sent,
            ws_clients_dropped,
            sink_failures,
        })
    }

    /// Get Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    // ========================================================================
    // INGESTION METRICS
    // ========================================================================

    /// Record one processed sample and its outcome
    pub fn record_sample(&self, is_ghost: bool, duration_secs: f64) {
        self.samples_processed.inc();
        self.detection_duration.observe(duration_secs);
        if is_ghost {
            self.ghosts_flagged.inc();
        }
    }

    /// Record a sample rejected at the pipeline boundary
    pub fn record_invalid_sample(&self) {
        self.samples_invalid.inc();
    }

    // ========================================================================
    // DETECTION STATE
    // ========================================================================

    pub fn set_recurring_vehicles(&self, count: i64) {
        self.recurring_vehicles.set(count);
    }

    pub fn set_tracked_vehicles(&self, count: i64) {
        self.tracked_vehicles.set(count);
    }

    // ========================================================================
    // FAN-OUT METRICS
    // ========================================================================

    pub fn set_ws_connections(&self, count: i64) {
        self.ws_connections.set(count);
    }

    pub fn record_ws_sent(&self, delivered: u64) {
        self.ws_messages_sent.inc_by(delivered);
    }

    pub fn record_ws_dropped(&self) {
        self.ws_clients_dropped.inc();
    }

    // ========================================================================
    // PERSISTENCE METRICS
    // ========================================================================

    pub fn record_sink_failure(&self) {
        self.sink_failures.inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create MetricsCollector")
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = MetricsCollector::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_metrics_export() {
        let metrics = MetricsCollector::new().unwrap();

        metrics.record_sample(true, 0.001);
        metrics.record_sample(false, 0.001);
        metrics.set_ws_connections(3);

        let export = metrics.export();
        assert!(export.contains("ghostbus_samples_processed_total 2"));
        assert!(export.contains("ghostbus_ghosts_flagged_total 1"));
        assert!(export.contains("ghostbus_ws_connections 3"));
    }

    #[test]
    fn test_sink_failures() {
        let metrics = MetricsCollector::new().unwrap();
        metrics.record_sink_failure();
        metrics.record_sink_failure();

        let export = metrics.export();
        assert!(export.contains("ghostbus_sink_failures_total 2"));
    }
}
