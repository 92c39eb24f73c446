//! Load ingest: first sighting of a load id creates the entity the rest of
//! the load pipeline operates on. Repeat sightings are never re-evaluated.

use bevy_ecs::prelude::{Commands, Res, ResMut};
use tracing::debug;

use crate::ecs::{CandidateSet, LoadDetails, LoadId, RefineOutcome, ScoredCandidates};
use crate::feed::{CurrentEvent, FeedEventKind};
use crate::registry::{ActiveLoad, LoadBoard};
use crate::telemetry::DispatchTelemetry;

pub fn load_ingest_system(
    mut commands: Commands,
    event: Res<CurrentEvent>,
    mut board: ResMut<LoadBoard>,
    mut active: ResMut<ActiveLoad>,
    mut telemetry: ResMut<DispatchTelemetry>,
) {
    active.0 = None;
    let FeedEventKind::LoadPosted(posting) = event.0.kind else {
        return;
    };
    let id = LoadId(posting.load_id);

    if board.contains(id) {
        telemetry.duplicate_loads += 1;
        debug!(load_id = posting.load_id, "load already known; skipping");
        return;
    }

    let entity = commands
        .spawn((
            id,
            LoadDetails {
                origin: posting.origin,
                destination: posting.destination,
                equipment: posting.equipment,
                price: posting.price,
                mileage: posting.mileage,
                posted_at: event.0.timestamp,
            },
            CandidateSet::default(),
            ScoredCandidates::default(),
            RefineOutcome::Pending,
        ))
        .id();
    board.insert(id, entity);
    active.0 = Some(entity);
    telemetry.loads_posted += 1;
    debug!(load_id = posting.load_id, "load posted");
}
