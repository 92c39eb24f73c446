//! The external key-value store boundary.
//!
//! Notifications are written under the truck's id and truck metrics under
//! `truck_metrics_<id>`. The downstream event API polls a truck's slot and
//! clears it after emitting, so the store contract includes [`take`]:
//! write-once-read-once per slot.
//!
//! [`take`]: NotificationStore::take

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::Resource;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ecs::{Equipment, NotificationRecord, TripPreference};
use crate::error::StoreError;

/// Key for a truck's pending-notification slot.
pub fn truck_key(truck_id: u32) -> String {
    truck_id.to_string()
}

/// Key for a truck's metrics document.
pub fn truck_metrics_key(truck_id: u32) -> String {
    format!("truck_metrics_{truck_id}")
}

/// Metrics document persisted per truck for the web API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckMetrics {
    pub position_latitude: f64,
    pub position_longitude: f64,
    pub equip_type: Equipment,
    pub next_trip_length_preference: TripPreference,
    pub latest_notification: Option<NaiveDateTime>,
    pub latest_loads: Vec<NotificationRecord>,
}

/// Redis-shaped store boundary the pipeline publishes through.
pub trait NotificationStore: Send + Sync {
    fn put(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Read and clear a slot in one step (the event-stream poll contract).
    fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Drop everything; used by the end-of-period reset.
    fn clear_all(&self) -> Result<(), StoreError>;
}

/// Resource wrapper for the store trait object.
#[derive(Resource, Clone)]
pub struct NotificationStoreResource(pub Arc<dyn NotificationStore>);

impl std::ops::Deref for NotificationStoreResource {
    type Target = dyn NotificationStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// In-process store used by tests and the replay harness.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all current keys, for harness reporting.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.keys().cloned().collect())
    }
}

impl NotificationStore for InMemoryStore {
    fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.remove(key))
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.clear();
        Ok(())
    }
}
