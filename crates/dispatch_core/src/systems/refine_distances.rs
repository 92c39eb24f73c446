//! Resolve exact distances for the current load's shortlist.
//!
//! The fan-out joins before anything is written back: a failed batch leaves
//! every distance pending and marks the load aborted.

use bevy_ecs::prelude::{Query, Res, ResMut, With};
use tracing::error;

use crate::ecs::{CandidateDistance, CandidateSet, LoadDetails, LoadId, Position, RefineOutcome, TruckId};
use crate::refine::{resolve_candidates, DistanceResolverResource};
use crate::registry::{ActiveLoad, TruckDirectory};
use crate::telemetry::DispatchTelemetry;

pub fn refine_distances_system(
    active: Res<ActiveLoad>,
    resolver: Res<DistanceResolverResource>,
    directory: Res<TruckDirectory>,
    mut telemetry: ResMut<DispatchTelemetry>,
    positions: Query<&Position, With<TruckId>>,
    mut loads: Query<(&LoadId, &LoadDetails, &mut CandidateSet, &mut RefineOutcome)>,
) {
    let Some(entity) = active.0 else {
        return;
    };
    let Ok((load_id, details, mut candidates, mut outcome)) = loads.get_mut(entity) else {
        return;
    };

    let mut pairs = Vec::with_capacity(candidates.0.len());
    for truck_id in candidates.0.keys() {
        let Some(truck_entity) = directory.get(*truck_id) else {
            continue;
        };
        if let Ok(position) = positions.get(truck_entity) {
            pairs.push((*truck_id, position.0));
        }
    }

    match resolve_candidates(resolver.0.as_ref(), details.origin, &pairs) {
        Ok(resolved) => {
            for (truck_id, miles) in resolved {
                candidates.0.insert(truck_id, CandidateDistance::Miles(miles));
            }
            *outcome = RefineOutcome::Resolved;
        }
        Err(err) => {
            *outcome = RefineOutcome::Failed;
            telemetry.refinements_failed += 1;
            error!(load_id = load_id.0, error = %err, "distance refinement failed; load aborted");
        }
    }
}
