//! Shared helpers for tests and the replay harness.
//!
//! Compiled behind the `test-helpers` feature so downstream binaries can
//! build canned events and a fully wired world without duplicating setup.

use std::sync::Arc;

use bevy_ecs::prelude::{Schedule, World};
use chrono::NaiveDateTime;
use h3o::LatLng;

use crate::config::DispatchConfig;
use crate::ecs::{Equipment, TripPreference};
use crate::feed::{FeedEvent, FeedEventKind, LoadPosted, TruckPing};
use crate::refine::{DistanceResolver, GreatCircleResolver};
use crate::runner::{build_dispatch_world, dispatch_schedule, ingest_event};
use crate::store::InMemoryStore;

/// Parse a `%Y-%m-%dT%H:%M:%S` timestamp, panicking on bad input.
pub fn ts(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").expect("well-formed timestamp")
}

/// Build a coordinate, panicking on out-of-range input.
pub fn coord(lat: f64, lng: f64) -> LatLng {
    LatLng::new(lat, lng).expect("valid coordinate")
}

pub fn new_orleans() -> LatLng {
    coord(29.9561, -90.0773)
}

pub fn atlanta() -> LatLng {
    coord(33.6821, -84.1488)
}

pub fn truck_event(
    seq: u64,
    timestamp: &str,
    truck_id: u32,
    position: LatLng,
    equipment: Equipment,
    preference: TripPreference,
) -> FeedEvent {
    FeedEvent {
        seq,
        timestamp: ts(timestamp),
        kind: FeedEventKind::TruckPing(TruckPing {
            truck_id,
            position,
            equipment,
            preference,
        }),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn load_event(
    seq: u64,
    timestamp: &str,
    load_id: u64,
    origin: LatLng,
    destination: LatLng,
    equipment: Equipment,
    price: f64,
    mileage: f64,
) -> FeedEvent {
    FeedEvent {
        seq,
        timestamp: ts(timestamp),
        kind: FeedEventKind::LoadPosted(LoadPosted {
            load_id,
            origin,
            destination,
            equipment,
            price,
            mileage,
        }),
    }
}

pub fn end_event(seq: u64, timestamp: &str) -> FeedEvent {
    FeedEvent {
        seq,
        timestamp: ts(timestamp),
        kind: FeedEventKind::PeriodEnd,
    }
}

/// A wired-up world, schedule, and in-memory store for end-to-end tests.
pub struct TestHarness {
    pub world: World,
    pub schedule: Schedule,
    pub store: Arc<InMemoryStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self::with_resolver(config, Arc::new(GreatCircleResolver))
    }

    pub fn with_resolver(config: DispatchConfig, resolver: Arc<dyn DistanceResolver>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let world = build_dispatch_world(config, store.clone(), resolver);
        Self {
            world,
            schedule: dispatch_schedule(),
            store,
        }
    }

    pub fn ingest(&mut self, event: FeedEvent) {
        ingest_event(&mut self.world, &mut self.schedule, event);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
