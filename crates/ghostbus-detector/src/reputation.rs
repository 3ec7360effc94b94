//! Recurring-offender reputation tracking
//!
//! Turns per-event ghost flags into a persistent reputation signal per
//! vehicle. Records are created lazily, mutated in place, and never
//! deleted here; retention is an external storage concern.

use dashmap::DashMap;
use ghostbus_core::{ReputationRecord, VehicleId};
use tracing::info;

/// Longitudinal reputation tracker keyed by vehicle id.
///
/// The read-modify-write update runs under the entry's shard guard, so
/// updates for one vehicle are atomic while distinct vehicles proceed in
/// parallel.
pub struct ReputationTracker {
    records: DashMap<VehicleId, ReputationRecord>,
    flag_threshold: u32,
}

impl ReputationTracker {
    pub fn new(flag_threshold: u32) -> Self {
        Self {
            records: DashMap::new(),
            flag_threshold,
        }
    }

    /// Fold one scored observation into the vehicle's record.
    ///
    /// Non-ghost observations create the record if absent but otherwise
    /// leave it untouched: flags, timestamps, and the running average only
    /// move on flagged events. Once `total_flags` reaches the threshold,
    /// `is_recurring` latches true and never resets.
    pub fn observe(&self, vehicle_id: &VehicleId, score: u32, is_ghost: bool, now: f64) {
        let mut record = self
            .records
            .entry(vehicle_id.clone())
            .or_insert_with(|| ReputationRecord::new(vehicle_id.clone()));

        if !is_ghost {
            return;
        }

        if record.first_flag_time.is_none() {
            record.first_flag_time = Some(now);
        }
        record.last_flag_time = Some(now);
        record.total_flags += 1;

        let n = record.total_flags as f64;
        record.avg_ghost_score = (record.avg_ghost_score * (n - 1.0) + score as f64) / n;

        if record.total_flags >= self.flag_threshold && !record.is_recurring {
            record.is_recurring = true;
            info!(vehicle = %vehicle_id, flags = record.total_flags, "vehicle marked as recurring ghost");
        }
    }

    /// Current recurring status; false for unknown vehicles
    pub fn is_recurring(&self, vehicle_id: &VehicleId) -> bool {
        self.records
            .get(vehicle_id)
            .map_or(false, |r| r.is_recurring)
    }

    /// Reputation snapshot for one vehicle
    pub fn reputation(&self, vehicle_id: &VehicleId) -> Option<ReputationRecord> {
        self.records.get(vehicle_id).map(|r| r.clone())
    }

    /// All recurring vehicles whose last flag falls within `within_days`
    /// of `now`. This is a read-time filter, not a pruning operation:
    /// records outside the window stay stored and re-enter the list if a
    /// later flag moves `last_flag_time` back inside it, or simply when
    /// the window is widened, since `is_recurring` never resets.
    pub fn list_recurring(&self, now: f64, within_days: f64) -> Vec<ReputationRecord> {
        let cutoff = now - within_days * 86_400.0;
        self.records
            .iter()
            .filter(|r| r.is_recurring && r.last_flag_time.is_some_and(|t| t >= cutoff))
            .map(|r| r.clone())
            .collect()
    }

    /// Number of vehicles with a reputation record
    pub fn vehicle_count(&self) -> usize {
        self.records.len()
    }

    /// Number of vehicles currently marked recurring
    pub fn recurring_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_recurring).count()
    }
}

// ============================================================================
// TESTS
// ============================================================================
