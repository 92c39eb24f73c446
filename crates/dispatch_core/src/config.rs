//! Pipeline configuration.
//!
//! Every business parameter of the pipeline lives here so tests and deployed
//! variants can tune them without touching the systems.

use bevy_ecs::prelude::Resource;

/// Tunable parameters for matching, scoring, and throttling.
#[derive(Debug, Clone, Copy, Resource)]
pub struct DispatchConfig {
    /// Operating cost per mile used by the profit model ($/mile).
    pub rate_per_mile: f64,
    /// Maximum trucks shortlisted per load.
    pub candidate_cap: usize,
    /// Maximum heap extractions while building the shortlist.
    pub selection_pop_limit: usize,
    /// Stated per-load notification cap. The ranking walk replicates the
    /// observed behavior of notifying up to one more truck than this; see
    /// [`crate::systems::rank_and_notify::ranked_recipients`].
    pub notify_cap: usize,
    /// Notification history entries retained per truck.
    pub history_cap: usize,
    /// Minimum seconds between two notifications to the same truck.
    pub throttle_secs: i64,
    /// Below this many active loads, clustering is skipped and the simple
    /// scoring policy applies.
    pub min_loads_for_clustering: usize,
    /// DBSCAN neighborhood radius over load origins, in miles.
    pub cluster_eps_miles: f64,
    /// DBSCAN minimum cluster size (including the core point).
    pub cluster_min_points: usize,
    /// A truck farther than this from every cluster centroid is isolated.
    pub isolation_threshold_miles: f64,
    /// Whether a repeat sighting of a known truck updates its position and
    /// last-seen timestamp. Off by default, pinning the legacy behavior of
    /// dropping repeat sightings.
    pub allow_truck_refresh: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rate_per_mile: 1.38,
            candidate_cap: 20,
            selection_pop_limit: 50,
            notify_cap: 20,
            history_cap: 5,
            throttle_secs: 1800,
            min_loads_for_clustering: 5,
            cluster_eps_miles: 75.0,
            cluster_min_points: 3,
            isolation_threshold_miles: 200.0,
            allow_truck_refresh: false,
        }
    }
}

impl DispatchConfig {
    pub fn with_throttle_secs(mut self, secs: i64) -> Self {
        self.throttle_secs = secs;
        self
    }

    pub fn with_candidate_cap(mut self, cap: usize) -> Self {
        self.candidate_cap = cap;
        self
    }

    pub fn with_notify_cap(mut self, cap: usize) -> Self {
        self.notify_cap = cap;
        self
    }

    pub fn with_truck_refresh(mut self, allow: bool) -> Self {
        self.allow_truck_refresh = allow;
        self
    }

    pub fn with_clustering(mut self, eps_miles: f64, min_points: usize) -> Self {
        self.cluster_eps_miles = eps_miles;
        self.cluster_min_points = min_points;
        self
    }

    pub fn with_isolation_threshold_miles(mut self, miles: f64) -> Self {
        self.isolation_threshold_miles = miles;
        self
    }
}
