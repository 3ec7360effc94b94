//! # Ghostbus Ingest
//!
//! The producer loop: pulls one batch of raw position reports per feed
//! cycle, runs every sample through the detection pipeline, and fans the
//! enriched records out to the persistence sink and the live subscribers.
//!
//! Within a batch, distinct vehicles are processed concurrently; samples
//! for the same vehicle run in received order so history and reputation
//! updates stay serialized per vehicle. Shutdown is cooperative: the
//! in-flight batch is drained before the loop exits, so no fully-formed
//! record is dropped.

pub mod feed;
pub mod sink;

pub use feed::{PositionFeed, SimulatedFeed};
pub use sink::{NullSink, RecordSink, SinkError};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use ghostbus_core::RawPosition;
use ghostbus_detector::{DetectionPipeline, DetectorError};
use ghostbus_telemetry::MetricsCollector;
use ghostbus_websocket::BroadcastHub;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Seconds since epoch, sub-second precision
pub fn epoch_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Drives the feed -> pipeline -> fan-out path
pub struct IngestLoop {
    pipeline: Arc<DetectionPipeline>,
    hub: Arc<BroadcastHub>,
    sink: Arc<dyn RecordSink>,
    metrics: Arc<MetricsCollector>,
    interval: Duration,
}

impl IngestLoop {
    pub fn new(
        pipeline: Arc<DetectionPipeline>,
        hub: Arc<BroadcastHub>,
        sink: Arc<dyn RecordSink>,
        metrics: Arc<MetricsCollector>,
        interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            hub,
            sink,
            metrics,
            interval,
        }
    }

    /// Run until shutdown is signalled. Each tick polls the feed once and
    /// processes the whole batch; a feed error skips the cycle.
    pub async fn run(
        &self,
        mut feed: impl PositionFeed,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        info!("Ingest loop started (interval {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match feed.poll().await {
                        Ok(batch) => {
                            debug!("Feed cycle produced {} samples", batch.len());
                            self.process_batch(batch).await;
                        }
                        Err(e) => {
                            warn!("Feed poll failed, skipping cycle: {}", e);
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Ingest loop stopped");
        Ok(())
    }

    /// Process one batch: group by vehicle id, run groups concurrently,
    /// keep samples within a group in received order.
    pub async fn process_batch(&self, batch: Vec<RawPosition>) {
        let mut groups: HashMap<Option<String>, Vec<RawPosition>> = HashMap::new();
        for raw in batch {
            groups.entry(raw.vehicle_id.clone()).or_default().push(raw);
        }

        join_all(
            groups
                .into_values()
                .map(|samples| self.process_group(samples)),
        )
        .await;

        self.metrics
            .set_tracked_vehicles(self.pipeline.history().vehicle_count() as i64);
        self.metrics
            .set_recurring_vehicles(self.pipeline.reputation().recurring_count() as i64);
        self.metrics.set_ws_connections(self.hub.client_count() as i64);
    }

    async fn process_group(&self, samples: Vec<RawPosition>) {
        for raw in samples {
            let now = epoch_now();
            let started = Instant::now();

            let record = match self.pipeline.process(raw, now) {
                Ok(record) => record,
                Err(DetectorError::InvalidSample(e)) => {
                    warn!("Dropping invalid sample: {}", e);
                    self.metrics.record_invalid_sample();
                    continue;
                }
                Err(e) => {
                    warn!("Detection failed: {}", e);
                    continue;
                }
            };

            self.metrics
                .record_sample(record.is_ghost, started.elapsed().as_secs_f64());

            let delivered = self.hub.publish(&record);
            self.metrics.record_ws_sent(delivered as u64);

            // Fire-and-forget persistence: failures never abort the loop
            if let Err(e) = self.sink.store(&record).await {
                warn!(vehicle = %record.vehicle_id, "Persistence failed: {}", e);
                self.metrics.record_sink_failure();
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
