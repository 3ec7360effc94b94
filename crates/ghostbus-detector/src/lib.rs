//! # Ghostbus Detector
//!
//! The anomaly-detection engine for transit vehicle positions. Flags
//! reports that are likely erroneous ("ghost" vehicles) using stateful
//! heuristics over recent per-vehicle history:
//!
//! - Sliding-window position history, bounded per vehicle
//! - Four independent detection rules (stale, stationary, off-route,
//!   speed anomaly)
//! - Composite scoring with a bounded score and a ghost verdict
//! - Longitudinal "recurring offender" reputation tracking
//! - The detection pipeline that ties them together per sample

pub mod error;
pub mod history;
pub mod pipeline;
pub mod reputation;
pub mod rules;
pub mod score;

pub use error::{DetectorError, DetectorResult};
pub use history::PositionHistoryStore;
pub use pipeline::DetectionPipeline;
pub use reputation::ReputationTracker;
pub use rules::{CorridorRouteMatcher, DisabledRouteMatcher, RouteMatcher};
pub use score::ScoringEngine;

/// Detection engine configuration.
///
/// Defaults mirror the reference deployment; every value is overridable
/// through the environment (see the server crate).
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Seconds without a feed update before a sample counts as stale
    pub stale_threshold_seconds: f64,
    /// History lookback window for the stationary rule, in seconds
    pub stationary_threshold_seconds: f64,
    /// Radius within which a vehicle counts as not having moved, in km
    pub stationary_radius_km: f64,
    /// Corridor half-width for the off-route matcher, in km
    pub off_route_threshold_km: f64,
    /// Idle time after which a vehicle's history window is discarded
    pub history_ttl_seconds: f64,
    /// Maximum retained positions per vehicle
    pub history_window_size: usize,
    /// Ghost flags required before a vehicle becomes a recurring offender
    pub recurring_flag_threshold: u32,
    /// Read-time lookback for listing recurring offenders, in days
    pub recurring_lookback_days: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            stale_threshold_seconds: 300.0,
            stationary_threshold_seconds: 600.0,
            stationary_radius_km: 0.05,
            off_route_threshold_km: 0.5,
            history_ttl_seconds: 86_400.0,
            history_window_size: 50,
            recurring_flag_threshold: 5,
            recurring_lookback_days: 7.0,
        }
    }
}
