//! Detection rules
//!
//! Four independent predicates over a position sample. Each is pure given
//! its inputs (the stationary rule additionally reads a history snapshot);
//! they are order-independent and individually evaluable.

use ghostbus_core::{GeoPoint, PositionSample, Polyline, VehicleId};

use crate::history::PositionHistoryStore;

/// Speed above which a report is considered implausible. Units follow the
/// feed (nominally km/h or m/s depending on deployment); the rule only
/// thresholds the raw value and never converts.
pub const SPEED_LIMIT: f64 = 80.0;

/// A sample is stale when its own timestamp lags `now` by more than the
/// threshold. A sample with no timestamp is treated as "now" and is
/// therefore never stale.
pub fn is_stale(sample: &PositionSample, now: f64, threshold_seconds: f64) -> bool {
    let last_update = sample.timestamp.unwrap_or(now);
    now - last_update > threshold_seconds
}

/// A vehicle is stationary when every qualifying history sample of the
/// last `window_seconds` sits within `radius_km` of the first one.
///
/// Fewer than two qualifying samples is insufficient evidence and never
/// flags. The first-vs-rest comparison is a deliberate O(n) approximation,
/// not a true diameter check; it can under-detect a vehicle that wanders
/// out and back.
pub fn is_stationary(
    history: &PositionHistoryStore,
    vehicle_id: &VehicleId,
    now: f64,
    window_seconds: f64,
    radius_km: f64,
) -> bool {
    let recent = history.recent_within(vehicle_id, window_seconds, now);
    if recent.len() < 2 {
        return false;
    }

    let anchor = recent[0].point();
    recent[1..]
        .iter()
        .all(|s| anchor.distance_to(&s.point()) <= radius_km)
}

/// A speed report is anomalous when it is implausibly fast or negative.
/// A missing speed defaults to zero and never fires.
pub fn is_speed_anomaly(sample: &PositionSample) -> bool {
    let speed = sample.speed.unwrap_or(0.0);
    speed > SPEED_LIMIT || speed < 0.0
}

// ============================================================================
// OFF-ROUTE MATCHING
// ============================================================================

/// Pluggable off-route detection strategy.
///
/// The corridor matcher below is the full map-matching building block; the
/// primary deployment runs the no-op variant because no static route
/// shapes are loaded for its feed. Swapping the strategy re-enables the
/// rule without touching the scoring engine.
pub trait RouteMatcher: Send + Sync {
    fn is_off_route(&self, sample: &PositionSample) -> bool;
}

/// Off-route detection disabled: every sample is on-route.
#[derive(Debug, Default)]
pub struct DisabledRouteMatcher;

impl RouteMatcher for DisabledRouteMatcher {
    fn is_off_route(&self, _sample: &PositionSample) -> bool {
        false
    }
}

/// Corridor matcher over static route shapes.
///
/// A sample is off-route when its distance to every shape segment of its
/// route exceeds the corridor threshold. Samples without a route id, or
/// on routes with no loaded shape, are never flagged.
pub struct CorridorRouteMatcher {
    shapes: std::collections::HashMap<String, Vec<Polyline>>,
    threshold_km: f64,
}

impl CorridorRouteMatcher {
    pub fn new(threshold_km: f64) -> Self {
        Self {
            shapes: std::collections::HashMap::new(),
            threshold_km,
        }
    }

    /// Load (or replace) the shape segments for one route
    pub fn load_route(&mut self, route_id: impl Into<String>, segments: Vec<Polyline>) {
        self.shapes.insert(route_id.into(), segments);
    }

    pub fn route_count(&self) -> usize {
        self.shapes.len()
    }

    fn min_distance_km(&self, route_id: &str, point: &GeoPoint) -> Option<f64> {
        self.shapes
            .get(route_id)?
            .iter()
            .filter_map(|line| line.distance_to_point(point))
            .min_by(|a, b| a.total_cmp(b))
    }
}

impl RouteMatcher for CorridorRouteMatcher {
    fn is_off_route(&self, sample: &PositionSample) -> bool {
        let Some(route_id) = sample.route_id.as_deref() else {
            return false;
        };
        match self.min_distance_km(route_id, &sample.point()) {
            Some(distance) => distance > self.threshold_km,
            None => false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    fn sample(id: &str, lat: f64, lon: f64, timestamp: Option<f64>) -> PositionSample {
        PositionSample {
            vehicle_id: VehicleId::new(id),
            route_id: None,
            trip_id: None,
            lat,
            lon,
            timestamp,
            speed: None,
            bearing: None,
        }
    }

    #[test]
    fn test_stale_boundary() {
        // Exactly at the threshold is not stale; one second past is
        let at = sample("bus", 42.0, -71.0, Some(NOW - 300.0));
        let past = sample("bus", 42.0, -71.0, Some(NOW - 301.0));
        assert!(!is_stale(&at, NOW, 300.0));
        assert!(is_stale(&past, NOW, 300.0));
    }

    #[test]
    fn test_missing_timestamp_is_fresh() {
        let no_ts = sample("bus", 42.0, -71.0, None);
        assert!(!is_stale(&no_ts, NOW, 300.0));
    }

    #[test]
    fn test_stationary_needs_two_samples() {
        let store = PositionHistoryStore::new(50, 86_400.0);
        let id = VehicleId::new("bus");
        assert!(!is_stationary(&store, &id, NOW, 600.0, 0.05));

        store.record(sample("bus", 42.0, -71.0, Some(NOW - 60.0)), NOW);
        assert!(!is_stationary(&store, &id, NOW, 600.0, 0.05));
    }

    #[test]
    fn test_stationary_all_within_radius() {
        let store = PositionHistoryStore::new(50, 86_400.0);
        let id = VehicleId::new("bus");
        // Three samples within a few meters of each other
        store.record(sample("bus", 42.36010, -71.05890, Some(NOW - 500.0)), NOW);
        store.record(sample("bus", 42.36012, -71.05891, Some(NOW - 300.0)), NOW);
        store.record(sample("bus", 42.36011, -71.05889, Some(NOW - 100.0)), NOW);
        assert!(is_stationary(&store, &id, NOW, 600.0, 0.05));
    }

    #[test]
    fn test_stationary_one_outlier_breaks_it() {
        let store = PositionHistoryStore::new(50, 86_400.0);
        let id = VehicleId::new("bus");
        store.record(sample("bus", 42.3601, -71.0589, Some(NOW - 500.0)), NOW);
        store.record(sample("bus", 42.3601, -71.0589, Some(NOW - 300.0)), NOW);
        // Roughly a kilometer away from the anchor
        store.record(sample("bus", 42.3691, -71.0589, Some(NOW - 100.0)), NOW);
        assert!(!is_stationary(&store, &id, NOW, 600.0, 0.05));
    }

    #[test]
    fn test_stationary_ignores_old_samples() {
        let store = PositionHistoryStore::new(50, 86_400.0);
        let id = VehicleId::new("bus");
        // Far-away position, but outside the lookback window
        store.record(sample("bus", 43.0, -71.0, Some(NOW - 2_000.0)), NOW);
        store.record(sample("bus", 42.3601, -71.0589, Some(NOW - 300.0)), NOW);
        store.record(sample("bus", 42.3601, -71.0589, Some(NOW - 100.0)), NOW);
        assert!(is_stationary(&store, &id, NOW, 600.0, 0.05));
    }

    #[test]
    fn test_speed_anomaly() {
        let mut s = sample("bus", 42.0, -71.0, Some(NOW));
        assert!(!is_speed_anomaly(&s)); // missing speed defaults to 0

        s.speed = Some(25.0);
        assert!(!is_speed_anomaly(&s));
        s.speed = Some(80.0);
        assert!(!is_speed_anomaly(&s)); // boundary is exclusive
        s.speed = Some(80.1);
        assert!(is_speed_anomaly(&s));
        s.speed = Some(-1.0);
        assert!(is_speed_anomaly(&s));
    }

    #[test]
    fn test_disabled_matcher_never_flags() {
        let matcher = DisabledRouteMatcher;
        let mut s = sample("bus", 0.0, 0.0, Some(NOW));
        s.route_id = Some("route_42".into());
        assert!(!matcher.is_off_route(&s));
    }

    #[test]
    fn test_corridor_matcher() {
        let mut matcher = CorridorRouteMatcher::new(0.5);
        matcher.load_route(
            "route_42",
            vec![Polyline::new(vec![
                GeoPoint::new(12.9716, 77.5946),
                GeoPoint::new(12.9750, 77.6000),
                GeoPoint::new(12.9800, 77.6050),
            ])],
        );

        let mut on_route = sample("bus", 12.9733, 77.5973, Some(NOW));
        on_route.route_id = Some("route_42".into());
        assert!(!matcher.is_off_route(&on_route));

        let mut off_route = sample("bus", 13.0827, 80.2707, Some(NOW));
        off_route.route_id = Some("route_42".into());
        assert!(matcher.is_off_route(&off_route));

        // Unknown route or no route id: never flagged
        let mut unknown = sample("bus", 13.0827, 80.2707, Some(NOW));
        unknown.route_id = Some("route_99".into());
        assert!(!matcher.is_off_route(&unknown));
        unknown.route_id = None;
        assert!(!matcher.is_off_route(&unknown));
    }
}
