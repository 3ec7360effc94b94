//! Composite ghost scoring
//!
//! Combines the four rule outputs into a bounded score and a verdict.
//! Deterministic for a fixed history snapshot.

use std::sync::Arc;

use ghostbus_core::{DetectionFlags, DetectionVerdict, PositionSample};

use crate::history::PositionHistoryStore;
use crate::rules::{self, RouteMatcher};
use crate::DetectorConfig;

/// Rule weights. The sum is capped at 100; a score above 50 is a ghost.
pub const WEIGHT_STALE: u32 = 40;
pub const WEIGHT_STATIONARY: u32 = 30;
pub const WEIGHT_OFF_ROUTE: u32 = 30;
pub const WEIGHT_SPEED_ANOMALY: u32 = 20;

const SCORE_CAP: u32 = 100;
const GHOST_THRESHOLD: u32 = 50;

/// Evaluates all rules for a sample and produces the composite verdict
pub struct ScoringEngine {
    config: DetectorConfig,
    history: Arc<PositionHistoryStore>,
    route_matcher: Arc<dyn RouteMatcher>,
}

impl ScoringEngine {
    pub fn new(
        config: DetectorConfig,
        history: Arc<PositionHistoryStore>,
        route_matcher: Arc<dyn RouteMatcher>,
    ) -> Self {
        Self {
            config,
            history,
            route_matcher,
        }
    }

    /// Evaluate all four rules and combine their weights
    pub fn score(&self, sample: &PositionSample, now: f64) -> DetectionVerdict {
        let flags = DetectionFlags {
            stale: rules::is_stale(sample, now, self.config.stale_threshold_seconds),
            stationary: rules::is_stationary(
                &self.history,
                &sample.vehicle_id,
                now,
                self.config.stationary_threshold_seconds,
                self.config.stationary_radius_km,
            ),
            off_route: self.route_matcher.is_off_route(sample),
            speed_anomaly: rules::is_speed_anomaly(sample),
        };

        let mut score = 0;
        if flags.stale {
            score += WEIGHT_STALE;
        }
        if flags.stationary {
            score += WEIGHT_STATIONARY;
        }
        if flags.off_route {
            score += WEIGHT_OFF_ROUTE;
        }
        if flags.speed_anomaly {
            score += WEIGHT_SPEED_ANOMALY;
        }
        let score = score.min(SCORE_CAP);

        DetectionVerdict {
            flags,
            score,
            is_ghost: score > GHOST_THRESHOLD,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::DisabledRouteMatcher;
    use ghostbus_core::VehicleId;

    const NOW: f64 = 1_700_000_000.0;

    fn engine(history: Arc<PositionHistoryStore>) -> ScoringEngine {
        ScoringEngine::new(
            DetectorConfig::default(),
            history,
            Arc::new(DisabledRouteMatcher),
        )
    }

    fn sample(timestamp: Option<f64>, speed: Option<f64>) -> PositionSample {
        PositionSample {
            vehicle_id: VehicleId::new("bus_001"),
            route_id: Some("route_42".into()),
            trip_id: None,
            lat: 42.3601,
            lon: -71.0589,
            timestamp,
            speed,
            bearing: None,
        }
    }

    #[test]
    fn test_clean_sample_scores_zero() {
        let history = Arc::new(PositionHistoryStore::new(50, 86_400.0));
        let verdict = engine(history).score(&sample(Some(NOW), Some(25.0)), NOW);
        assert_eq!(verdict.score, 0);
        assert!(!verdict.is_ghost);
    }

    #[test]
    fn test_stale_only_is_not_ghost() {
        let history = Arc::new(PositionHistoryStore::new(50, 86_400.0));
        let verdict = engine(history).score(&sample(Some(NOW - 400.0), Some(25.0)), NOW);
        assert_eq!(verdict.score, 40);
        assert!(verdict.flags.stale);
        assert!(!verdict.is_ghost);
    }

    #[test]
    fn test_stale_plus_stationary_is_ghost() {
        let history = Arc::new(PositionHistoryStore::new(50, 86_400.0));
        let s1 = sample(Some(NOW - 500.0), Some(0.0));
        let s2 = sample(Some(NOW - 400.0), Some(0.0));
        history.record(s1, NOW);
        history.record(s2.clone(), NOW);

        let verdict = engine(history).score(&s2, NOW);
        assert!(verdict.flags.stale);
        assert!(verdict.flags.stationary);
        assert_eq!(verdict.score, 70);
        assert!(verdict.is_ghost);
    }

    #[test]
    fn test_score_is_monotonic_in_fired_rules() {
        let history = Arc::new(PositionHistoryStore::new(50, 86_400.0));
        let engine = engine(history.clone());

        let none = engine.score(&sample(Some(NOW), Some(25.0)), NOW);
        let stale = engine.score(&sample(Some(NOW - 400.0), Some(25.0)), NOW);
        let stale_speed = engine.score(&sample(Some(NOW - 400.0), Some(120.0)), NOW);

        assert!(none.score <= stale.score);
        assert!(stale.score <= stale_speed.score);
        assert!(stale_speed.score <= 100);
    }

    #[test]
    fn test_score_cap() {
        // Fire every rule, off_route included, via a matcher stub
        struct AlwaysOff;
        impl RouteMatcher for AlwaysOff {
            fn is_off_route(&self, _sample: &PositionSample) -> bool {
                true
            }
        }

        let history = Arc::new(PositionHistoryStore::new(50, 86_400.0));
        let s1 = sample(Some(NOW - 500.0), Some(-1.0));
        let s2 = sample(Some(NOW - 400.0), Some(-1.0));
        history.record(s1, NOW);
        history.record(s2.clone(), NOW);

        let engine = ScoringEngine::new(
            DetectorConfig::default(),
            history,
            Arc::new(AlwaysOff),
        );
        let verdict = engine.score(&s2, NOW);

        // 40 + 30 + 30 + 20 = 120, capped
        assert_eq!(verdict.score, 100);
        assert!(verdict.is_ghost);
    }
}
