//! Isolation detection against the current load-origin clusters.
//!
//! A truck far from every demand cluster is "isolated"; isolated trucks get a
//! bonus for loads whose destination lands near a cluster, pulling them back
//! toward demand. Policy variant implemented here: only isolated trucks are
//! scored, from the load destination's distance to its nearest centroid.

use h3o::LatLng;

use crate::clustering::{centroids, dbscan};
use crate::geo::haversine_miles;

/// Upper bound of the proximity score range.
pub const PROXIMITY_SCORE_MAX: f64 = 10.0;

/// Cluster centroids for the current set of active loads, with the isolation
/// threshold baked in. Built once per load event, consulted per truck.
#[derive(Debug, Clone)]
pub struct IsolationModel {
    centroids: Vec<LatLng>,
    isolation_threshold_miles: f64,
}

impl IsolationModel {
    /// Cluster the active load origins and keep the non-noise centroids.
    ///
    /// Degenerate input (too few origins for any cluster) yields an empty
    /// centroid set, under which every truck is isolated at infinite
    /// distance and proximity saturates to its minimum.
    pub fn from_load_origins(
        origins: &[LatLng],
        eps_miles: f64,
        min_points: usize,
        isolation_threshold_miles: f64,
    ) -> Self {
        let labels = dbscan(origins, eps_miles, min_points);
        Self {
            centroids: centroids(origins, &labels),
            isolation_threshold_miles,
        }
    }

    pub fn centroid_count(&self) -> usize {
        self.centroids.len()
    }

    /// Distance from `point` to the nearest cluster centroid, in miles.
    /// Infinite when no clusters were found.
    pub fn cluster_distance_miles(&self, point: LatLng) -> f64 {
        self.centroids
            .iter()
            .map(|c| haversine_miles(point, *c))
            .fold(f64::INFINITY, f64::min)
    }

    /// A truck is isolated when it sits beyond the threshold from every
    /// cluster.
    pub fn is_isolated(&self, point: LatLng) -> bool {
        self.cluster_distance_miles(point) > self.isolation_threshold_miles
    }

    /// Proximity sub-score for a truck against this load.
    ///
    /// Non-isolated trucks score 0; isolated trucks score the load
    /// destination's distance to its nearest centroid through a decreasing
    /// inverse-log transform into [0, PROXIMITY_SCORE_MAX].
    pub fn proximity_score(&self, truck_position: LatLng, load_destination: LatLng) -> f64 {
        if !self.is_isolated(truck_position) {
            return 0.0;
        }
        proximity_transform(self.cluster_distance_miles(load_destination))
    }
}

/// Monotonically decreasing map from miles to [0, PROXIMITY_SCORE_MAX];
/// saturates to 0 for non-finite input (no clusters).
fn proximity_transform(distance_miles: f64) -> f64 {
    if !distance_miles.is_finite() {
        return 0.0;
    }
    (PROXIMITY_SCORE_MAX / (1.0 + distance_miles.max(0.0).ln_1p()))
        .clamp(0.0, PROXIMITY_SCORE_MAX)
}
