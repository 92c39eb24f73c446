//! Rank the scored shortlist and publish throttled notifications.
//!
//! This is the anti-spam gate: non-positive scores are never notified, a
//! truck inside its throttle window is skipped without consuming quota, and
//! the walk stops once the notified count passes the configured cap.

use std::cmp::Ordering;

use bevy_ecs::prelude::{Query, Res, ResMut, With};
use chrono::NaiveDateTime;
use tracing::{error, info, warn};

use crate::config::DispatchConfig;
use crate::ecs::{
    LoadDetails, LoadId, NotificationHistory, NotificationRecord, NotificationState,
    RefineOutcome, ScoredCandidate, ScoredCandidates, TruckId,
};
use crate::feed::CurrentEvent;
use crate::registry::{ActiveLoad, TruckDirectory};
use crate::store::{truck_key, truck_metrics_key, NotificationStoreResource, TruckMetrics};
use crate::telemetry::DispatchTelemetry;

/// True when the truck sits inside its throttle window. A never-notified
/// truck is exempt regardless of the window.
pub fn throttled(state: NotificationState, now: NaiveDateTime, window_secs: i64) -> bool {
    match state {
        NotificationState::NeverNotified => false,
        NotificationState::NotifiedAt(t) => (now - t).num_seconds() < window_secs,
    }
}

/// Sort by score descending (ties by ascending truck id) and walk off the
/// recipients to notify.
///
/// The legacy walk checked the quota before each candidate and counted with a
/// post-increment, so one more truck than the stated cap can be notified.
/// That behavior is kept deliberately; `notify_cap` is the stated cap and the
/// effective limit is `notify_cap + 1`.
pub fn ranked_recipients(
    scored: &mut Vec<ScoredCandidate>,
    notify_cap: usize,
    mut is_throttled: impl FnMut(TruckId) -> bool,
) -> Vec<ScoredCandidate> {
    scored.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.truck_id.cmp(&b.truck_id))
    });

    let mut recipients = Vec::new();
    for candidate in scored.iter() {
        if recipients.len() > notify_cap {
            break;
        }
        if candidate.total <= 0.0 {
            continue;
        }
        if is_throttled(candidate.truck_id) {
            continue;
        }
        recipients.push(*candidate);
    }
    recipients
}

pub fn rank_and_notify_system(
    event: Res<CurrentEvent>,
    active: Res<ActiveLoad>,
    config: Res<DispatchConfig>,
    directory: Res<TruckDirectory>,
    store: Res<NotificationStoreResource>,
    mut telemetry: ResMut<DispatchTelemetry>,
    loads: Query<(&LoadId, &LoadDetails, &ScoredCandidates, &RefineOutcome)>,
    mut trucks: Query<(&mut NotificationState, &mut NotificationHistory), With<TruckId>>,
) {
    let Some(entity) = active.0 else {
        return;
    };
    let Ok((load_id, details, scored, outcome)) = loads.get(entity) else {
        return;
    };
    if *outcome != RefineOutcome::Resolved {
        return;
    }

    let now = event.0.timestamp;
    let mut ranked = scored.0.clone();
    let mut throttled_skips = 0u64;
    let recipients = ranked_recipients(&mut ranked, config.notify_cap, |truck_id| {
        let Some(truck_entity) = directory.get(truck_id) else {
            return true;
        };
        let Ok((state, _)) = trucks.get(truck_entity) else {
            return true;
        };
        if throttled(*state, now, config.throttle_secs) {
            throttled_skips += 1;
            true
        } else {
            false
        }
    });
    telemetry.notifications_throttled += throttled_skips;

    for candidate in recipients {
        let Some(truck_entity) = directory.get(candidate.truck_id) else {
            continue;
        };
        let Ok((mut state, mut history)) = trucks.get_mut(truck_entity) else {
            continue;
        };

        let record = NotificationRecord {
            score: candidate.total,
            profit: candidate.profit,
            timestamp: now,
            load_id: load_id.0,
            origin_latitude: details.origin.lat(),
            origin_longitude: details.origin.lng(),
            destination_latitude: details.destination.lat(),
            destination_longitude: details.destination.lng(),
            mileage: details.mileage,
        };
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(err) => {
                telemetry.store_errors += 1;
                error!(truck_id = candidate.truck_id.0, error = %err, "payload encoding failed");
                continue;
            }
        };
        // Publish first: a store failure must leave in-memory state untouched
        // so the truck stays eligible for the next load.
        if let Err(err) = store.put(&truck_key(candidate.truck_id.0), payload) {
            telemetry.store_errors += 1;
            error!(truck_id = candidate.truck_id.0, error = %err, "notification publish failed");
            continue;
        }

        history.push_recent(record.clone(), config.history_cap);
        *state = NotificationState::NotifiedAt(now);
        telemetry.notifications_sent += 1;
        info!(
            truck_id = candidate.truck_id.0,
            load_id = load_id.0,
            score = candidate.total,
            "truck notified"
        );

        if let Err(err) = update_truck_metrics(
            store.0.as_ref(),
            candidate.truck_id.0,
            &record,
            now,
            config.history_cap,
        ) {
            telemetry.store_errors += 1;
            warn!(truck_id = candidate.truck_id.0, error = %err, "truck metrics update failed");
        }
    }
}

/// Read-modify-write of the per-truck metrics document the web API serves.
fn update_truck_metrics(
    store: &dyn crate::store::NotificationStore,
    truck_id: u32,
    record: &NotificationRecord,
    now: NaiveDateTime,
    history_cap: usize,
) -> Result<(), crate::error::StoreError> {
    let key = truck_metrics_key(truck_id);
    let Some(raw) = store.get(&key)? else {
        // Metrics doc missing (e.g. written before a reset); nothing to update.
        return Ok(());
    };
    let mut metrics: TruckMetrics = serde_json::from_str(&raw)?;
    metrics.latest_notification = Some(now);
    metrics.latest_loads.insert(0, record.clone());
    metrics.latest_loads.truncate(history_cap);
    store.put(&key, serde_json::to_string(&metrics)?)
}
