//! # Ghostbus Core
//!
//! Core domain models and types for the Ghostbus transit anomaly-detection
//! system. This crate provides shared types used across all services.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod events;
pub mod geo;

pub use error::{CoreError, CoreResult};
pub use events::EnrichedRecord;
pub use geo::*;

// ============================================================================
// VEHICLE MODELS
// ============================================================================

/// Unique identifier for a vehicle, as reported by the upstream feed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VehicleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VehicleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Raw position report as produced by the ingestion collaborator.
///
/// Every field is optional: the upstream feed routinely omits fields, and
/// validation happens at the pipeline boundary, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPosition {
    pub vehicle_id: Option<String>,
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Seconds since epoch
    pub timestamp: Option<f64>,
    pub speed: Option<f64>,
    /// Bearing in degrees
    pub bearing: Option<f64>,
}

/// Validated, immutable position sample.
///
/// `vehicle_id`, `lat`, and `lon` are the only hard-required fields; the
/// rest degrade to documented defaults in the detection rules. Speed is
/// deliberately not sanity-checked: negative or implausibly large values
/// are signal for the speed-anomaly rule, not garbage to reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSample {
    pub vehicle_id: VehicleId,
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Seconds since epoch. Missing means "treat as fresh".
    pub timestamp: Option<f64>,
    pub speed: Option<f64>,
    pub bearing: Option<f64>,
}

impl PositionSample {
    /// Position of this sample as a geo point
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

impl TryFrom<RawPosition> for PositionSample {
    type Error = CoreError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        let vehicle_id = match raw.vehicle_id {
            Some(id) if !id.is_empty() => VehicleId::new(id),
            _ => return Err(CoreError::InvalidSample("missing vehicle_id".into())),
        };
        let lat = raw
            .lat
            .ok_or_else(|| CoreError::InvalidSample("missing lat".into()))?;
        let lon = raw
            .lon
            .ok_or_else(|| CoreError::InvalidSample("missing lon".into()))?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(CoreError::InvalidPosition { lat, lon });
        }

        Ok(Self {
            vehicle_id,
            route_id: raw.route_id,
            trip_id: raw.trip_id,
            lat,
            lon,
            timestamp: raw.timestamp,
            speed: raw.speed,
            bearing: raw.bearing,
        })
    }
}

// ============================================================================
// DETECTION MODELS
// ============================================================================

/// Per-rule detection outcomes for one sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionFlags {
    pub stale: bool,
    pub stationary: bool,
    pub off_route: bool,
    pub speed_anomaly: bool,
}

/// Composite verdict produced once per sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectionVerdict {
    pub flags: DetectionFlags,
    /// Composite score in [0, 100]
    pub score: u32,
    /// Ghost iff score > 50
    pub is_ghost: bool,
}

/// Longitudinal reputation of one vehicle across the event stream.
///
/// Mutated in place by the reputation tracker; non-ghost observations
/// leave every field untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub vehicle_id: VehicleId,
    /// Count of is_ghost observations ever seen
    pub total_flags: u32,
    /// Seconds since epoch, unset until the first flag
    pub first_flag_time: Option<f64>,
    pub last_flag_time: Option<f64>,
    /// Running mean over flagged events only
    pub avg_ghost_score: f64,
    /// Monotonic: once true, never reset
    pub is_recurring: bool,
}

impl ReputationRecord {
    pub fn new(vehicle_id: VehicleId) -> Self {
        Self {
            vehicle_id,
            total_flags: 0,
            first_flag_time: None,
            last_flag_time: None,
            avg_ghost_score: 0.0,
            is_recurring: false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(vehicle_id: Option<&str>, lat: Option<f64>, lon: Option<f64>) -> RawPosition {
        RawPosition {
            vehicle_id: vehicle_id.map(String::from),
            lat,
            lon,
            ..Default::default()
        }
    }

    #[test]
    fn test_sample_validation() {
        let sample = PositionSample::try_from(raw(Some("bus_001"), Some(42.36), Some(-71.06)));
        assert!(sample.is_ok());
        assert_eq!(sample.unwrap().vehicle_id.as_str(), "bus_001");
    }

    #[test]
    fn test_sample_missing_fields() {
        assert!(PositionSample::try_from(raw(None, Some(42.0), Some(-71.0))).is_err());
        assert!(PositionSample::try_from(raw(Some(""), Some(42.0), Some(-71.0))).is_err());
        assert!(PositionSample::try_from(raw(Some("bus_001"), None, Some(-71.0))).is_err());
        assert!(PositionSample::try_from(raw(Some("bus_001"), Some(42.0), None)).is_err());
    }

    #[test]
    fn test_sample_out_of_range_position() {
        let err = PositionSample::try_from(raw(Some("bus_001"), Some(100.0), Some(0.0)));
        assert!(matches!(err, Err(CoreError::InvalidPosition { .. })));
    }

    #[test]
    fn test_optional_fields_survive() {
        let mut r = raw(Some("bus_001"), Some(42.0), Some(-71.0));
        r.speed = Some(-3.5);
        r.timestamp = None;
        let sample = PositionSample::try_from(r).unwrap();
        assert_eq!(sample.speed, Some(-3.5));
        assert!(sample.timestamp.is_none());
    }
}
