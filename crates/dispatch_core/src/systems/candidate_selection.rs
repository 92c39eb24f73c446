//! Shortlist the nearest equipment-compatible trucks for the current load.

use bevy_ecs::prelude::{Query, Res};
use tracing::debug;

use crate::config::DispatchConfig;
use crate::ecs::{CandidateSet, Equipment, LoadDetails, LoadId, Position, TruckId};
use crate::registry::ActiveLoad;
use crate::selection::select_candidates;

pub fn candidate_selection_system(
    active: Res<ActiveLoad>,
    config: Res<DispatchConfig>,
    trucks: Query<(&TruckId, &Position, &Equipment)>,
    mut loads: Query<(&LoadId, &LoadDetails, &mut CandidateSet)>,
) {
    let Some(entity) = active.0 else {
        return;
    };
    let Ok((load_id, details, mut candidates)) = loads.get_mut(entity) else {
        return;
    };

    *candidates = select_candidates(
        details.origin,
        details.equipment,
        trucks.iter().map(|(id, position, equipment)| (*id, position.0, *equipment)),
        &config,
    );
    debug!(
        load_id = load_id.0,
        candidates = candidates.0.len(),
        "shortlist selected"
    );
}
