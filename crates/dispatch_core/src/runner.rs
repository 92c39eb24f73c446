//! Dispatch runner: routes feed events into the ECS.
//!
//! One event at a time is inserted as [CurrentEvent] and the schedule runs
//! once; conditions keep systems out of events they do not react to. The load
//! pipeline is a chained group so selection, refinement, scoring, and
//! notification all observe the same world snapshot for one load.

use std::sync::Arc;

use bevy_ecs::prelude::Res;
use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::config::DispatchConfig;
use crate::feed::{CurrentEvent, FeedEvent, FeedEventKind};
use crate::refine::{DistanceResolver, DistanceResolverResource};
use crate::registry::{ActiveLoad, LoadBoard, TruckDirectory};
use crate::store::{NotificationStore, NotificationStoreResource};
use crate::systems::{
    candidate_selection::candidate_selection_system, load_ingest::load_ingest_system,
    period_end::period_end_system, rank_and_notify::rank_and_notify_system,
    refine_distances::refine_distances_system, score_candidates::score_candidates_system,
    truck_ingest::truck_ingest_system,
};
use crate::telemetry::DispatchTelemetry;

// Condition functions for each event kind
fn is_truck_ping(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| matches!(e.0.kind, FeedEventKind::TruckPing(_)))
        .unwrap_or(false)
}

fn is_load_posted(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| matches!(e.0.kind, FeedEventKind::LoadPosted(_)))
        .unwrap_or(false)
}

fn is_period_end(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| matches!(e.0.kind, FeedEventKind::PeriodEnd))
        .unwrap_or(false)
}

/// Builds the dispatch schedule.
///
/// The load group is chained with an [apply_deferred] barrier after ingest so
/// the freshly spawned load entity is visible to the rest of the pipeline
/// within the same event.
pub fn dispatch_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        truck_ingest_system.run_if(is_truck_ping),
        (
            load_ingest_system,
            apply_deferred,
            candidate_selection_system,
            refine_distances_system,
            score_candidates_system,
            rank_and_notify_system,
        )
            .chain()
            .run_if(is_load_posted),
        period_end_system.run_if(is_period_end),
    ));
    schedule
}

/// Builds a world carrying every resource the schedule needs.
///
/// The store and resolver are injected so tests and deployments choose their
/// own backends.
pub fn build_dispatch_world(
    config: DispatchConfig,
    store: Arc<dyn NotificationStore>,
    resolver: Arc<dyn DistanceResolver>,
) -> World {
    let mut world = World::new();
    world.insert_resource(config);
    world.insert_resource(TruckDirectory::default());
    world.insert_resource(LoadBoard::default());
    world.insert_resource(ActiveLoad::default());
    world.insert_resource(DispatchTelemetry::default());
    world.insert_resource(NotificationStoreResource(store));
    world.insert_resource(DistanceResolverResource(resolver));
    world
}

/// Processes one feed event: records it, inserts it as [CurrentEvent], and
/// runs the schedule.
pub fn ingest_event(world: &mut World, schedule: &mut Schedule, event: FeedEvent) {
    let label = event.kind.label();
    world.resource_mut::<DispatchTelemetry>().record_event(label);
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use h3o::LatLng;

    use crate::ecs::{Equipment, NotificationHistory, NotificationRecord, TripPreference, TruckId};
    use crate::error::DistanceError;
    use crate::refine::DistanceResolver;
    use crate::store::{truck_key, truck_metrics_key, TruckMetrics};
    use crate::test_helpers::{
        atlanta, coord, end_event, load_event, new_orleans, truck_event, ts, TestHarness,
    };

    use super::*;

    fn near_new_orleans() -> LatLng {
        coord(30.0, -90.0)
    }

    fn seattle() -> LatLng {
        coord(47.6062, -122.3321)
    }

    #[test]
    fn truck_then_load_produces_a_notification() {
        let mut harness = TestHarness::new();
        harness.ingest(truck_event(
            1,
            "2023-11-17T08:00:00",
            189,
            near_new_orleans(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        harness.ingest(load_event(
            2,
            "2023-11-17T09:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));

        let telemetry = harness.world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.trucks_ingested, 1);
        assert_eq!(telemetry.loads_posted, 1);
        assert_eq!(telemetry.notifications_sent, 1);

        let payload = harness
            .store
            .take(&truck_key(189))
            .unwrap()
            .expect("notification published");
        let record: NotificationRecord = serde_json::from_str(&payload).unwrap();
        assert_eq!(record.load_id, 40022);
        assert!(record.profit > 0.0);
        assert!(payload.contains("\"loadId\":40022"));

        let metrics: TruckMetrics = serde_json::from_str(
            &harness
                .store
                .get(&truck_metrics_key(189))
                .unwrap()
                .expect("metrics document"),
        )
        .unwrap();
        assert_eq!(metrics.latest_notification, Some(ts("2023-11-17T09:00:00")));
        assert_eq!(metrics.latest_loads.len(), 1);
        assert_eq!(metrics.latest_loads[0].load_id, 40022);
    }

    #[test]
    fn equipment_mismatch_notifies_nobody() {
        let mut harness = TestHarness::new();
        harness.ingest(truck_event(
            1,
            "2023-11-17T08:00:00",
            189,
            near_new_orleans(),
            Equipment::Reefer,
            TripPreference::Long,
        ));
        harness.ingest(load_event(
            2,
            "2023-11-17T09:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Van,
            1000.0,
            480.0,
        ));

        let telemetry = harness.world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.notifications_sent, 0);
        assert!(harness.store.take(&truck_key(189)).unwrap().is_none());
    }

    #[test]
    fn repeat_notifications_are_throttled_within_the_window() {
        let mut harness = TestHarness::new();
        harness.ingest(truck_event(
            1,
            "2023-11-17T08:00:00",
            189,
            near_new_orleans(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        harness.ingest(load_event(
            2,
            "2023-11-17T09:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));
        // Ten minutes later: inside the 1800s window, suppressed.
        harness.ingest(load_event(
            3,
            "2023-11-17T09:10:00",
            40023,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));
        // Thirty-five minutes after the first notification: window expired.
        harness.ingest(load_event(
            4,
            "2023-11-17T09:35:00",
            40024,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));

        let telemetry = harness.world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.notifications_sent, 2);
        assert_eq!(telemetry.notifications_throttled, 1);

        let payload = harness.store.take(&truck_key(189)).unwrap().unwrap();
        let record: NotificationRecord = serde_json::from_str(&payload).unwrap();
        assert_eq!(record.load_id, 40024);
    }

    #[test]
    fn period_end_clears_world_and_store() {
        let mut harness = TestHarness::new();
        harness.ingest(truck_event(
            1,
            "2023-11-17T08:00:00",
            189,
            near_new_orleans(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        harness.ingest(load_event(
            2,
            "2023-11-17T09:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));
        harness.ingest(end_event(3, "2023-11-17T20:00:00"));

        assert!(harness.world.resource::<TruckDirectory>().is_empty());
        assert!(harness.world.resource::<LoadBoard>().is_empty());
        assert!(harness.store.keys().unwrap().is_empty());
        assert_eq!(harness.world.resource::<DispatchTelemetry>().resets, 1);

        // The same load id posted after the reset finds an empty fleet.
        harness.ingest(load_event(
            4,
            "2023-11-17T21:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));
        let telemetry = harness.world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.loads_posted, 2);
        assert_eq!(telemetry.notifications_sent, 1);
    }

    #[test]
    fn repeat_truck_sighting_is_dropped_by_default() {
        let mut harness = TestHarness::new();
        harness.ingest(truck_event(
            1,
            "2023-11-17T08:00:00",
            189,
            seattle(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        // Second sighting near the load origin is ignored.
        harness.ingest(truck_event(
            2,
            "2023-11-17T08:30:00",
            189,
            near_new_orleans(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        harness.ingest(load_event(
            3,
            "2023-11-17T09:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));

        let telemetry = harness.world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.truck_updates_dropped, 1);
        // Deadhead from Seattle makes the load unprofitable.
        assert_eq!(telemetry.notifications_sent, 0);
        assert_eq!(telemetry.unprofitable_candidates, 1);
    }

    #[test]
    fn refresh_enabled_moves_the_truck_before_matching() {
        let config = DispatchConfig::default().with_truck_refresh(true);
        let mut harness = TestHarness::with_config(config);
        harness.ingest(truck_event(
            1,
            "2023-11-17T08:00:00",
            189,
            seattle(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        harness.ingest(truck_event(
            2,
            "2023-11-17T08:30:00",
            189,
            near_new_orleans(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        harness.ingest(load_event(
            3,
            "2023-11-17T09:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));

        let telemetry = harness.world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.trucks_refreshed, 1);
        assert_eq!(telemetry.notifications_sent, 1);
    }

    #[test]
    fn duplicate_load_is_not_reevaluated() {
        let mut harness = TestHarness::new();
        harness.ingest(truck_event(
            1,
            "2023-11-17T08:00:00",
            189,
            near_new_orleans(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        harness.ingest(load_event(
            2,
            "2023-11-17T09:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));
        // Same load id an hour later, well outside the throttle window.
        harness.ingest(load_event(
            3,
            "2023-11-17T10:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));

        let telemetry = harness.world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.loads_posted, 1);
        assert_eq!(telemetry.duplicate_loads, 1);
        assert_eq!(telemetry.notifications_sent, 1);
    }

    #[test]
    fn history_keeps_the_five_most_recent_notifications() {
        let mut harness = TestHarness::new();
        harness.ingest(truck_event(
            1,
            "2023-11-17T00:00:00",
            189,
            near_new_orleans(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        // Seven loads spaced an hour apart so the throttle never fires.
        for i in 0..7u64 {
            harness.ingest(load_event(
                2 + i,
                &format!("2023-11-17T{:02}:00:00", 1 + i),
                40022 + i,
                new_orleans(),
                atlanta(),
                Equipment::Flatbed,
                1000.0,
                480.0,
            ));
        }

        assert_eq!(
            harness.world.resource::<DispatchTelemetry>().notifications_sent,
            7
        );
        let entity = harness
            .world
            .resource::<TruckDirectory>()
            .get(TruckId(189))
            .expect("truck registered");
        let history = harness
            .world
            .get::<NotificationHistory>(entity)
            .expect("history component");
        assert_eq!(history.len(), 5);
        let load_ids: Vec<u64> = history.records().map(|r| r.load_id).collect();
        assert_eq!(load_ids, vec![40028, 40027, 40026, 40025, 40024]);
    }

    #[test]
    fn resolver_failure_aborts_the_load_without_notifying() {
        struct AlwaysFails;

        impl DistanceResolver for AlwaysFails {
            fn resolve_miles(&self, _from: LatLng, _to: LatLng) -> Result<f64, DistanceError> {
                Err(DistanceError::Resolution("mileage service down".into()))
            }
        }

        let mut harness =
            TestHarness::with_resolver(DispatchConfig::default(), Arc::new(AlwaysFails));
        harness.ingest(truck_event(
            1,
            "2023-11-17T08:00:00",
            189,
            near_new_orleans(),
            Equipment::Flatbed,
            TripPreference::Long,
        ));
        harness.ingest(load_event(
            2,
            "2023-11-17T09:00:00",
            40022,
            new_orleans(),
            atlanta(),
            Equipment::Flatbed,
            1000.0,
            480.0,
        ));

        let telemetry = harness.world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.refinements_failed, 1);
        assert_eq!(telemetry.notifications_sent, 0);
        assert!(harness.store.take(&truck_key(189)).unwrap().is_none());
    }
}
