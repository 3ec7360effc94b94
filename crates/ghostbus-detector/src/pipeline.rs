//! The per-sample detection pipeline
//!
//! Orchestrates one sample through the engine: validate, record history,
//! score, fold into reputation, read back the recurring snapshot, and
//! assemble the enriched record.

use std::sync::Arc;

use ghostbus_core::{EnrichedRecord, PositionSample, RawPosition};
use tracing::warn;

use crate::error::{DetectorError, DetectorResult};
use crate::history::PositionHistoryStore;
use crate::reputation::ReputationTracker;
use crate::rules::RouteMatcher;
use crate::score::ScoringEngine;
use crate::DetectorConfig;

/// Ties the history store, scoring engine, and reputation tracker
/// together. Shared across all ingestion tasks; every mutation is scoped
/// to the sample's own vehicle id.
pub struct DetectionPipeline {
    history: Arc<PositionHistoryStore>,
    scoring: ScoringEngine,
    reputation: Arc<ReputationTracker>,
    config: DetectorConfig,
}

impl DetectionPipeline {
    pub fn new(config: DetectorConfig, route_matcher: Arc<dyn RouteMatcher>) -> Self {
        let history = Arc::new(PositionHistoryStore::new(
            config.history_window_size,
            config.history_ttl_seconds,
        ));
        let scoring = ScoringEngine::new(config.clone(), history.clone(), route_matcher);
        let reputation = Arc::new(ReputationTracker::new(config.recurring_flag_threshold));

        Self {
            history,
            scoring,
            reputation,
            config,
        }
    }

    /// Process one raw report into an enriched record.
    ///
    /// Fails only on an invalid sample (missing vehicle_id/lat/lon or an
    /// out-of-range coordinate); the caller drops the sample and moves on.
    /// Mutates history and reputation for this vehicle only.
    pub fn process(&self, raw: RawPosition, now: f64) -> DetectorResult<EnrichedRecord> {
        let sample = PositionSample::try_from(raw).map_err(DetectorError::InvalidSample)?;

        self.history.record(sample.clone(), now);
        let verdict = self.scoring.score(&sample, now);
        self.reputation
            .observe(&sample.vehicle_id, verdict.score, verdict.is_ghost, now);
        let is_recurring = self.reputation.is_recurring(&sample.vehicle_id);

        if verdict.is_ghost {
            warn!(
                vehicle = %sample.vehicle_id,
                score = verdict.score,
                recurring = is_recurring,
                "ghost vehicle detected"
            );
        }

        Ok(EnrichedRecord::new(sample, verdict, is_recurring, now))
    }

    /// Read-only history query surface, safe concurrently with ingestion
    pub fn history(&self) -> &Arc<PositionHistoryStore> {
        &self.history
    }

    /// Read-only reputation query surface
    pub fn reputation(&self) -> &Arc<ReputationTracker> {
        &self.reputation
    }

    /// All recurring vehicles flagged within the configured lookback
    pub fn list_recurring(&self, now: f64) -> Vec<ghostbus_core::ReputationRecord> {
        self.reputation
            .list_recurring(now, self.config.recurring_lookback_days)
    }
}

// ============================================================================
// TESTS
// ============================================================================
