//! Score the current load's refined shortlist under the policy the
//! active-load count selects.

use bevy_ecs::prelude::{Query, Res, ResMut, With};
use h3o::LatLng;
use tracing::debug;

use crate::config::DispatchConfig;
use crate::ecs::{
    CandidateDistance, CandidateSet, LastSeen, LoadDetails, NotificationState, Position,
    RefineOutcome, ScoredCandidate, ScoredCandidates, TripPreference, TruckId,
};
use crate::feed::CurrentEvent;
use crate::isolation::IsolationModel;
use crate::registry::{ActiveLoad, LoadBoard, TruckDirectory};
use crate::scoring::{policy_for, ScoringInput};
use crate::telemetry::DispatchTelemetry;

pub fn score_candidates_system(
    event: Res<CurrentEvent>,
    active: Res<ActiveLoad>,
    config: Res<DispatchConfig>,
    board: Res<LoadBoard>,
    directory: Res<TruckDirectory>,
    mut telemetry: ResMut<DispatchTelemetry>,
    all_loads: Query<&LoadDetails>,
    trucks: Query<(&Position, &TripPreference, &LastSeen, &NotificationState), With<TruckId>>,
    mut target: Query<(&LoadDetails, &CandidateSet, &RefineOutcome, &mut ScoredCandidates)>,
) {
    let Some(entity) = active.0 else {
        return;
    };
    let Ok((details, candidates, outcome, mut scored)) = target.get_mut(entity) else {
        return;
    };
    if *outcome != RefineOutcome::Resolved {
        return;
    }

    // Clustering is statistically unreliable on a handful of loads; below
    // the threshold the simple policy redistributes the cluster weight.
    let active_count = board.len();
    let policy = policy_for(active_count, config.min_loads_for_clustering);
    let model = if active_count >= config.min_loads_for_clustering {
        let origins: Vec<LatLng> = all_loads.iter().map(|d| d.origin).collect();
        Some(IsolationModel::from_load_origins(
            &origins,
            config.cluster_eps_miles,
            config.cluster_min_points,
            config.isolation_threshold_miles,
        ))
    } else {
        None
    };

    let now = event.0.timestamp;
    scored.0.clear();
    for (truck_id, distance) in candidates.0.iter() {
        let CandidateDistance::Miles(miles) = distance else {
            continue;
        };
        let Some(truck_entity) = directory.get(*truck_id) else {
            continue;
        };
        let Ok((position, preference, last_seen, state)) = trucks.get(truck_entity) else {
            continue;
        };

        let breakdown = policy.score(&ScoringInput {
            load: details,
            candidate_miles: *miles,
            truck_position: position.0,
            preference: *preference,
            last_seen: last_seen.0,
            notification_state: *state,
            now,
            isolation: model.as_ref(),
            rate_per_mile: config.rate_per_mile,
        });
        if breakdown.total <= 0.0 {
            telemetry.unprofitable_candidates += 1;
        }
        scored.0.push(ScoredCandidate {
            truck_id: *truck_id,
            total: breakdown.total,
            profit: breakdown.profit,
        });
    }
    debug!(
        policy = policy.name(),
        scored = scored.0.len(),
        "shortlist scored"
    );
}
