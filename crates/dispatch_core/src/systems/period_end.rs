//! Period end: tear down every truck and load and wipe the store.

use bevy_ecs::prelude::{Commands, Entity, Or, Query, Res, ResMut, With};
use tracing::{error, info};

use crate::ecs::{LoadId, TruckId};
use crate::registry::{ActiveLoad, LoadBoard, TruckDirectory};
use crate::store::NotificationStoreResource;
use crate::telemetry::DispatchTelemetry;

pub fn period_end_system(
    mut commands: Commands,
    store: Res<NotificationStoreResource>,
    mut directory: ResMut<TruckDirectory>,
    mut board: ResMut<LoadBoard>,
    mut active: ResMut<ActiveLoad>,
    mut telemetry: ResMut<DispatchTelemetry>,
    entities: Query<Entity, Or<(With<TruckId>, With<LoadId>)>>,
) {
    let trucks = directory.len();
    let loads = board.len();
    for entity in entities.iter() {
        commands.entity(entity).despawn();
    }
    directory.clear();
    board.clear();
    active.0 = None;

    if let Err(err) = store.clear_all() {
        telemetry.store_errors += 1;
        error!(error = %err, "store wipe failed at period end");
    }
    telemetry.resets += 1;
    info!(trucks, loads, "operating period ended; state cleared");
}
