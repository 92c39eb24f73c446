//! Id → entity registries for trucks and loads.
//!
//! Feed events address entities by their external ids; these resources give
//! the systems O(1) lookups instead of scanning all entities. Cleared on the
//! end-of-period reset.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Resource};

use crate::ecs::{LoadId, TruckId};

/// All known trucks, keyed by feed truck id.
#[derive(Debug, Default, Resource)]
pub struct TruckDirectory {
    by_id: HashMap<TruckId, Entity>,
}

impl TruckDirectory {
    pub fn insert(&mut self, id: TruckId, entity: Entity) {
        self.by_id.insert(id, entity);
    }

    pub fn get(&self, id: TruckId) -> Option<Entity> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: TruckId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
    }
}

/// All active loads, keyed by feed load id.
#[derive(Debug, Default, Resource)]
pub struct LoadBoard {
    by_id: HashMap<LoadId, Entity>,
}

impl LoadBoard {
    pub fn insert(&mut self, id: LoadId, entity: Entity) {
        self.by_id.insert(id, entity);
    }

    pub fn get(&self, id: LoadId) -> Option<Entity> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: LoadId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Number of active loads; drives the scoring-policy selection.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
    }
}

/// The load entity the current `Load` event targets, set by load ingest.
///
/// `None` when the event duplicated an already-seen load id, which stops the
/// rest of the load pipeline from re-evaluating the old entity.
#[derive(Debug, Default, Resource)]
pub struct ActiveLoad(pub Option<Entity>);
