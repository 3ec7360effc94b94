//! Per-vehicle sliding-window position history
//!
//! One bounded window per vehicle id, most-recent-first. Retention is
//! governed by push order, not by the samples' own timestamps: an
//! out-of-order or backdated sample still displaces the oldest entry.
//! Detection scenarios depend on this FIFO-by-arrival behavior.

use std::collections::VecDeque;

use dashmap::DashMap;
use ghostbus_core::{PositionSample, VehicleId};
use tracing::debug;

/// Bounded ordered log of recent raw positions, keyed by vehicle id.
///
/// Backed by a sharded map: records for distinct vehicles proceed in
/// parallel, while record/read for the same vehicle are serialized so a
/// reader never observes a torn window.
pub struct PositionHistoryStore {
    capacity: usize,
    ttl_seconds: f64,
    windows: DashMap<VehicleId, HistoryWindow>,
}

#[derive(Debug)]
struct HistoryWindow {
    /// Most-recent-first
    samples: VecDeque<PositionSample>,
    /// Last push time (wall clock, not the sample's timestamp field)
    last_push: f64,
}

impl PositionHistoryStore {
    pub fn new(capacity: usize, ttl_seconds: f64) -> Self {
        Self {
            capacity,
            ttl_seconds,
            windows: DashMap::new(),
        }
    }

    /// Append a sample to the vehicle's window, evicting the oldest entry
    /// when the window is full, and refresh the window's idle expiry.
    pub fn record(&self, sample: PositionSample, now: f64) {
        let mut window = self
            .windows
            .entry(sample.vehicle_id.clone())
            .or_insert_with(|| HistoryWindow {
                samples: VecDeque::with_capacity(self.capacity),
                last_push: now,
            });

        // A window idle past its TTL is discarded wholesale before the
        // new sample starts a fresh one.
        if now - window.last_push > self.ttl_seconds {
            debug!(vehicle = %sample.vehicle_id, "history window expired, resetting");
            window.samples.clear();
        }

        window.samples.push_front(sample);
        while window.samples.len() > self.capacity {
            window.samples.pop_back();
        }
        window.last_push = now;
    }

    /// All stored samples for a vehicle whose reported timestamp is within
    /// `window_seconds` of `now`. A missing timestamp counts as epoch zero,
    /// which excludes the sample from any realistic window. Unknown vehicle
    /// ids yield an empty vector, never an error. No side effects.
    pub fn recent_within(
        &self,
        vehicle_id: &VehicleId,
        window_seconds: f64,
        now: f64,
    ) -> Vec<PositionSample> {
        let Some(window) = self.windows.get(vehicle_id) else {
            return Vec::new();
        };

        if now - window.last_push > self.ttl_seconds {
            return Vec::new();
        }

        window
            .samples
            .iter()
            .filter(|s| now - s.timestamp.unwrap_or(0.0) <= window_seconds)
            .cloned()
            .collect()
    }

    /// Read-only query surface: stored samples within the last `days`.
    pub fn history(&self, vehicle_id: &VehicleId, days: f64, now: f64) -> Vec<PositionSample> {
        self.recent_within(vehicle_id, days * 86_400.0, now)
    }

    /// Number of stored samples for one vehicle
    pub fn window_len(&self, vehicle_id: &VehicleId) -> usize {
        self.windows.get(vehicle_id).map_or(0, |w| w.samples.len())
    }

    /// Number of vehicles with a live window
    pub fn vehicle_count(&self) -> usize {
        self.windows.len()
    }

    /// Drop every window idle past its TTL. Returns the number removed.
    pub fn sweep_expired(&self, now: f64) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now - window.last_push <= self.ttl_seconds);
        before - self.windows.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    fn sample(id: &str, lat: f64, timestamp: Option<f64>) -> PositionSample {
        PositionSample {
            vehicle_id: VehicleId::new(id),
            route_id: None,
            trip_id: None,
            lat,
            lon: -71.0,
            timestamp,
            speed: None,
            bearing: None,
        }
    }

    #[test]
    fn test_unknown_vehicle_is_empty() {
        let store = PositionHistoryStore::new(50, 86_400.0);
        assert!(store
            .recent_within(&VehicleId::new("nobody"), 600.0, NOW)
            .is_empty());
    }

    #[test]
    fn test_push_order_eviction() {
        let store = PositionHistoryStore::new(3, 86_400.0);
        for i in 0..5 {
            store.record(sample("bus", i as f64, Some(NOW)), NOW);
        }
        assert_eq!(store.window_len(&VehicleId::new("bus")), 3);

        // Most recent pushes survive, oldest evicted regardless of timestamp
        let recent = store.recent_within(&VehicleId::new("bus"), 600.0, NOW);
        let lats: Vec<f64> = recent.iter().map(|s| s.lat).collect();
        assert_eq!(lats, vec![4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_backdated_sample_still_displaces() {
        let store = PositionHistoryStore::new(2, 86_400.0);
        store.record(sample("bus", 1.0, Some(NOW)), NOW);
        store.record(sample("bus", 2.0, Some(NOW)), NOW);
        // Backdated by an hour, still lands in front
        store.record(sample("bus", 3.0, Some(NOW - 3600.0)), NOW);

        let all = store.recent_within(&VehicleId::new("bus"), 86_400.0, NOW);
        let lats: Vec<f64> = all.iter().map(|s| s.lat).collect();
        assert_eq!(lats, vec![3.0, 2.0]);
    }

    #[test]
    fn test_window_filters_by_timestamp() {
        let store = PositionHistoryStore::new(50, 86_400.0);
        store.record(sample("bus", 1.0, Some(NOW - 100.0)), NOW);
        store.record(sample("bus", 2.0, Some(NOW - 700.0)), NOW);
        store.record(sample("bus", 3.0, None), NOW);

        let recent = store.recent_within(&VehicleId::new("bus"), 600.0, NOW);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].lat, 1.0);
    }

    #[test]
    fn test_ttl_expiry() {
        let store = PositionHistoryStore::new(50, 86_400.0);
        store.record(sample("bus", 1.0, Some(NOW)), NOW);

        let later = NOW + 90_000.0; // past the 24h TTL
        assert!(store
            .recent_within(&VehicleId::new("bus"), 1_000_000.0, later)
            .is_empty());

        // A new push resets the window rather than resurrecting old entries
        store.record(sample("bus", 2.0, Some(later)), later);
        let recent = store.recent_within(&VehicleId::new("bus"), 600.0, later);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].lat, 2.0);
    }

    #[test]
    fn test_sweep_expired() {
        let store = PositionHistoryStore::new(50, 86_400.0);
        store.record(sample("live", 1.0, Some(NOW)), NOW);
        store.record(sample("dead", 1.0, Some(NOW - 90_000.0)), NOW - 90_000.0);

        assert_eq!(store.vehicle_count(), 2);
        assert_eq!(store.sweep_expired(NOW), 1);
        assert_eq!(store.vehicle_count(), 1);
    }
}
