//! Truck ingest: first sighting creates the truck, repeat sightings are
//! dropped unless refresh is enabled.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut, With};
use tracing::{debug, error};

use crate::config::DispatchConfig;
use crate::ecs::{
    LastSeen, NotificationHistory, NotificationState, Position, TruckId,
};
use crate::feed::{CurrentEvent, FeedEventKind};
use crate::registry::TruckDirectory;
use crate::store::{truck_metrics_key, NotificationStoreResource, TruckMetrics};
use crate::telemetry::DispatchTelemetry;

pub fn truck_ingest_system(
    mut commands: Commands,
    event: Res<CurrentEvent>,
    config: Res<DispatchConfig>,
    mut directory: ResMut<TruckDirectory>,
    store: Res<NotificationStoreResource>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut trucks: Query<(&mut Position, &mut LastSeen), With<TruckId>>,
) {
    let FeedEventKind::TruckPing(ping) = event.0.kind else {
        return;
    };
    let id = TruckId(ping.truck_id);

    if let Some(entity) = directory.get(id) {
        if config.allow_truck_refresh {
            if let Ok((mut position, mut last_seen)) = trucks.get_mut(entity) {
                position.0 = ping.position;
                last_seen.0 = event.0.timestamp;
                telemetry.trucks_refreshed += 1;
            }
        } else {
            telemetry.truck_updates_dropped += 1;
            debug!(truck_id = ping.truck_id, "repeat truck sighting dropped");
        }
        return;
    }

    let entity = commands
        .spawn((
            id,
            Position(ping.position),
            ping.equipment,
            ping.preference,
            LastSeen(event.0.timestamp),
            NotificationState::NeverNotified,
            NotificationHistory::default(),
        ))
        .id();
    directory.insert(id, entity);
    telemetry.trucks_ingested += 1;
    debug!(truck_id = ping.truck_id, "truck registered");

    let metrics = TruckMetrics {
        position_latitude: ping.position.lat(),
        position_longitude: ping.position.lng(),
        equip_type: ping.equipment,
        next_trip_length_preference: ping.preference,
        latest_notification: None,
        latest_loads: Vec::new(),
    };
    let persisted = serde_json::to_string(&metrics)
        .map_err(crate::error::StoreError::from)
        .and_then(|json| store.put(&truck_metrics_key(ping.truck_id), json));
    if let Err(err) = persisted {
        telemetry.store_errors += 1;
        error!(truck_id = ping.truck_id, error = %err, "initial truck metrics write failed");
    }
}
