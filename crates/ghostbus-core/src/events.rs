//! Wire types for the live detection stream
//!
//! The enriched record is the payload delivered to every dashboard
//! subscriber and handed to the persistence collaborator. Its field names
//! are a contract: renaming any of them breaks downstream consumers.

use serde::{Deserialize, Serialize};

use crate::{DetectionFlags, DetectionVerdict, PositionSample, VehicleId};

/// Output of the detection pipeline for a single position sample:
/// the sample itself plus the verdict and the vehicle's reputation
/// snapshot at the moment of processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub vehicle_id: VehicleId,
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub speed: Option<f64>,
    pub bearing: Option<f64>,
    /// Seconds since epoch, as reported by the feed
    pub timestamp: Option<f64>,
    /// Composite score in [0, 100]
    pub ghost_score: u32,
    pub is_ghost: bool,
    /// Snapshot of the vehicle's recurring status when this sample was processed
    pub is_recurring_ghost: bool,
    /// Seconds since epoch at evaluation time
    pub detection_timestamp: f64,
    pub detection_rules: DetectionFlags,
}

impl EnrichedRecord {
    pub fn new(
        sample: PositionSample,
        verdict: DetectionVerdict,
        is_recurring_ghost: bool,
        detection_timestamp: f64,
    ) -> Self {
        Self {
            vehicle_id: sample.vehicle_id,
            route_id: sample.route_id,
            trip_id: sample.trip_id,
            lat: sample.lat,
            lon: sample.lon,
            speed: sample.speed,
            bearing: sample.bearing,
            timestamp: sample.timestamp,
            ghost_score: verdict.score,
            is_ghost: verdict.is_ghost,
            is_recurring_ghost,
            detection_timestamp,
            detection_rules: verdict.flags,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
