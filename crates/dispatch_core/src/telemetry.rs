//! In-process counters for pipeline observability.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

/// Counters maintained across the life of one dispatch world.
#[derive(Debug, Default, Resource)]
pub struct DispatchTelemetry {
    /// Processed events by feed label (`Truck`, `Load`, `End`, `Start`).
    pub events_by_kind: HashMap<&'static str, u64>,
    pub trucks_ingested: u64,
    pub trucks_refreshed: u64,
    pub truck_updates_dropped: u64,
    pub loads_posted: u64,
    pub duplicate_loads: u64,
    pub notifications_sent: u64,
    pub notifications_throttled: u64,
    pub unprofitable_candidates: u64,
    pub refinements_failed: u64,
    pub store_errors: u64,
    pub resets: u64,
}

impl DispatchTelemetry {
    pub fn record_event(&mut self, label: &'static str) {
        *self.events_by_kind.entry(label).or_insert(0) += 1;
    }

    pub fn events_processed(&self) -> u64 {
        self.events_by_kind.values().sum()
    }

    /// One-line summary for the replay harness and shutdown logs.
    pub fn summary(&self) -> String {
        format!(
            "events={} trucks={} loads={} notified={} throttled={} unprofitable={} \
             refine_failures={} store_errors={} resets={}",
            self.events_processed(),
            self.trucks_ingested,
            self.loads_posted,
            self.notifications_sent,
            self.notifications_throttled,
            self.unprofitable_candidates,
            self.refinements_failed,
            self.store_errors,
            self.resets,
        )
    }
}
