//! Components for truck and load entities, plus the notification payload.
//!
//! Trucks and loads live in the [`bevy_ecs::world::World`]; each feed event
//! mutates them through the systems in [`crate::systems`]. Ownership is
//! single-writer: only the ingest and notification paths touch truck state.

use std::collections::{BTreeMap, VecDeque};

use bevy_ecs::prelude::Component;
use chrono::NaiveDateTime;
use h3o::LatLng;
use serde::{Deserialize, Serialize};

/// Unique truck identity from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Component)]
pub struct TruckId(pub u32);

/// Unique load identity from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Component)]
pub struct LoadId(pub u64);

/// Last reported truck position.
#[derive(Debug, Clone, Copy, Component)]
pub struct Position(pub LatLng);

/// Equipment category; candidate selection requires an exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Component)]
pub enum Equipment {
    Van,
    Flatbed,
    Reefer,
}

/// Driver's stated preference for the next trip's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Component)]
pub enum TripPreference {
    Short,
    Long,
}

/// Timestamp of the most recent feed sighting of this truck.
#[derive(Debug, Clone, Copy, Component)]
pub struct LastSeen(pub NaiveDateTime);

/// Whether (and when) this truck was last notified.
///
/// Explicit state instead of the timestamp-equality proxy the legacy rule
/// used: a never-notified truck bypasses the throttle window outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub enum NotificationState {
    NeverNotified,
    NotifiedAt(NaiveDateTime),
}

/// Payload published to the store and retained in truck history.
///
/// Denormalizes the load so the downstream consumer needs no second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub score: f64,
    pub profit: f64,
    pub timestamp: NaiveDateTime,
    pub load_id: u64,
    pub origin_latitude: f64,
    pub origin_longitude: f64,
    pub destination_latitude: f64,
    pub destination_longitude: f64,
    pub mileage: f64,
}

/// Bounded, most-recent-first list of notifications sent to a truck.
#[derive(Debug, Clone, Default, Component)]
pub struct NotificationHistory {
    records: VecDeque<NotificationRecord>,
}

impl NotificationHistory {
    /// Insert at the front, evicting the oldest entry past `cap`.
    pub fn push_recent(&mut self, record: NotificationRecord, cap: usize) {
        self.records.push_front(record);
        self.records.truncate(cap);
    }

    pub fn records(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Immutable facts about a posted load.
#[derive(Debug, Clone, Copy, Component)]
pub struct LoadDetails {
    pub origin: LatLng,
    pub destination: LatLng,
    pub equipment: Equipment,
    pub price: f64,
    pub mileage: f64,
    pub posted_at: NaiveDateTime,
}

/// Distance entry for one shortlisted truck: approximate selection leaves it
/// pending, refinement replaces it with exact miles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CandidateDistance {
    Pending,
    Miles(f64),
}

/// Shortlist of trucks for one load, truck id → resolved distance.
///
/// `BTreeMap` keeps iteration in ascending truck id order, which makes the
/// pipeline deterministic for equal scores and distances.
#[derive(Debug, Clone, Default, Component)]
pub struct CandidateSet(pub BTreeMap<TruckId, CandidateDistance>);

/// One scored candidate, retained through ranking and into the payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub truck_id: TruckId,
    pub total: f64,
    pub profit: f64,
}

/// Scores for a load's shortlist, filled by the scoring system.
#[derive(Debug, Clone, Default, Component)]
pub struct ScoredCandidates(pub Vec<ScoredCandidate>);

/// Outcome of the parallel distance refinement for a load.
///
/// A failed batch blocks ranking entirely; no partial distances are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub enum RefineOutcome {
    Pending,
    Resolved,
    Failed,
}
