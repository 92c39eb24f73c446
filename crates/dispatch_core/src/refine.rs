//! Parallel distance refinement for a load's shortlist.
//!
//! Every candidate's exact distance is resolved concurrently and joined
//! before any result is used: either the whole batch resolves, or the load is
//! aborted. The resolver is a trait seam so a road-mileage service can stand
//! in for the great-circle default.

use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use h3o::LatLng;
use rayon::prelude::*;

use crate::ecs::TruckId;
use crate::error::DistanceError;
use crate::geo::haversine_miles;

/// Resolves the exact truck → load-origin distance in miles.
pub trait DistanceResolver: Send + Sync {
    fn resolve_miles(&self, from: LatLng, to: LatLng) -> Result<f64, DistanceError>;
}

/// The contracted resolver: great-circle distance. Infallible in practice,
/// but kept behind the fallible trait so callers handle the service-backed
/// variants uniformly.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreatCircleResolver;

impl DistanceResolver for GreatCircleResolver {
    fn resolve_miles(&self, from: LatLng, to: LatLng) -> Result<f64, DistanceError> {
        Ok(haversine_miles(from, to))
    }
}

/// Resource wrapper for the distance resolver trait object.
#[derive(Resource, Clone)]
pub struct DistanceResolverResource(pub Arc<dyn DistanceResolver>);

impl std::ops::Deref for DistanceResolverResource {
    type Target = dyn DistanceResolver;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Resolve exact distances for all candidates of one load.
///
/// Fans out across the rayon pool and joins before returning. Any single
/// failure fails the whole batch; no partial distances escape.
pub fn resolve_candidates(
    resolver: &dyn DistanceResolver,
    origin: LatLng,
    candidates: &[(TruckId, LatLng)],
) -> Result<Vec<(TruckId, f64)>, DistanceError> {
    candidates
        .par_iter()
        .map(|&(truck_id, position)| {
            resolver
                .resolve_miles(position, origin)
                .map(|miles| (truck_id, miles))
        })
        .collect()
}
