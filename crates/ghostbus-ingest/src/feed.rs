//! Upstream feed collaborator interface and the built-in demo feed

use async_trait::async_trait;
use ghostbus_core::RawPosition;

/// Produces one batch of raw position reports per feed cycle.
///
/// Fetching and parsing the actual transit feed (GTFS-realtime or
/// otherwise) is an external concern; implementations of this trait are
/// the seam where it plugs in.
#[async_trait]
pub trait PositionFeed: Send {
    async fn poll(&mut self) -> anyhow::Result<Vec<RawPosition>>;
}

/// Deterministic demo feed: a handful of vehicles walking a waypoint
/// loop, plus one frozen vehicle that keeps reporting a stale position so
/// a fresh checkout demonstrates ghost detection end to end.
pub struct SimulatedFeed {
    vehicles: Vec<SimVehicle>,
    /// How far each poll advances a vehicle between waypoints
    step: f64,
}

struct SimVehicle {
    id: String,
    route_id: String,
    waypoint_index: usize,
    progress: f64,
    speed: f64,
    /// Frozen vehicles report the same position with an aging timestamp
    frozen: bool,
}

/// Loop through central Boston; positions only need to be plausible
const WAYPOINTS: &[(f64, f64)] = &[
    (42.3601, -71.0589),
    (42.3662, -71.0621),
    (42.3736, -71.0572),
    (42.3770, -71.0504),
    (42.3712, -71.0448),
    (42.3635, -71.0501),
];

impl SimulatedFeed {
    pub fn new(vehicle_count: usize) -> Self {
        let mut vehicles: Vec<SimVehicle> = (1..=vehicle_count)
            .map(|i| SimVehicle {
                id: format!("bus_{:03}", i),
                route_id: format!("route_{}", 40 + i % 3),
                waypoint_index: i % WAYPOINTS.len(),
                progress: 0.0,
                speed: 18.0 + (i as f64 * 1.5),
                frozen: false,
            })
            .collect();

        vehicles.push(SimVehicle {
            id: "ghost_bus".into(),
            route_id: "route_99".into(),
            waypoint_index: 0,
            progress: 0.0,
            speed: 0.0,
            frozen: true,
        });

        Self {
            vehicles,
            step: 0.05,
        }
    }
}

#[async_trait]
impl PositionFeed for SimulatedFeed {
    async fn poll(&mut self) -> anyhow::Result<Vec<RawPosition>> {
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        let step = self.step;

        let batch = self
            .vehicles
            .iter_mut()
            .map(|v| {
                let (lat, lon, timestamp) = if v.frozen {
                    let wp = WAYPOINTS[v.waypoint_index];
                    // Always reports a position from well past the stale threshold
                    (wp.0, wp.1, now - 400.0)
                } else {
                    v.progress += step;
                    if v.progress >= 1.0 {
                        v.progress = 0.0;
                        v.waypoint_index = (v.waypoint_index + 1) % WAYPOINTS.len();
                    }
                    let current = WAYPOINTS[v.waypoint_index];
                    let next = WAYPOINTS[(v.waypoint_index + 1) % WAYPOINTS.len()];
                    (
                        current.0 + (next.0 - current.0) * v.progress,
                        current.1 + (next.1 - current.1) * v.progress,
                        now,
                    )
                };

                RawPosition {
                    vehicle_id: Some(v.id.clone()),
                    route_id: Some(v.route_id.clone()),
                    trip_id: None,
                    lat: Some(lat),
                    lon: Some(lon),
                    timestamp: Some(timestamp),
                    speed: Some(v.speed),
                    bearing: None,
                }
            })
            .collect();

        Ok(batch)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_batch_shape() {
        let mut feed = SimulatedFeed::new(4);
        let batch = feed.poll().await.unwrap();

        assert_eq!(batch.len(), 5); // 4 live + 1 frozen
        assert!(batch.iter().all(|r| r.vehicle_id.is_some()));
        assert!(batch.iter().all(|r| r.lat.is_some() && r.lon.is_some()));
    }

    #[tokio::test]
    async fn test_frozen_vehicle_is_stale_and_pinned() {
        let mut feed = SimulatedFeed::new(2);
        let first = feed.poll().await.unwrap();
        let second = feed.poll().await.unwrap();

        let ghost_a = first.iter().find(|r| r.vehicle_id.as_deref() == Some("ghost_bus")).unwrap();
        let ghost_b = second.iter().find(|r| r.vehicle_id.as_deref() == Some("ghost_bus")).unwrap();

        assert_eq!(ghost_a.lat, ghost_b.lat);
        assert_eq!(ghost_a.lon, ghost_b.lon);

        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        assert!(now - ghost_b.timestamp.unwrap() > 300.0);
    }

    #[tokio::test]
    async fn test_live_vehicles_move() {
        let mut feed = SimulatedFeed::new(1);
        let first = feed.poll().await.unwrap();
        let second = feed.poll().await.unwrap();

        let a = first.iter().find(|r| r.vehicle_id.as_deref() == Some("bus_001")).unwrap();
        let b = second.iter().find(|r| r.vehicle_id.as_deref() == Some("bus_001")).unwrap();
        assert!(a.lat != b.lat || a.lon != b.lon);
    }
}
