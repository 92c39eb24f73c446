//! Inbound feed events: parsing and the per-step event resource.
//!
//! The pub-sub transport is external; this module owns the message shapes it
//! delivers. Payloads are JSON keyed by a `type` discriminator (`Truck`,
//! `Load`, `End`, `Start`); anything else is an error the caller logs and
//! drops.

use bevy_ecs::prelude::Resource;
use chrono::{DateTime, NaiveDateTime};
use h3o::LatLng;
use serde::Deserialize;

use crate::ecs::{Equipment, TripPreference};
use crate::error::FeedError;

/// A position report for one truck.
#[derive(Debug, Clone, Copy)]
pub struct TruckPing {
    pub truck_id: u32,
    pub position: LatLng,
    pub equipment: Equipment,
    pub preference: TripPreference,
}

/// A newly posted load.
#[derive(Debug, Clone, Copy)]
pub struct LoadPosted {
    pub load_id: u64,
    pub origin: LatLng,
    pub destination: LatLng,
    pub equipment: Equipment,
    pub price: f64,
    pub mileage: f64,
}

#[derive(Debug, Clone, Copy)]
pub enum FeedEventKind {
    TruckPing(TruckPing),
    LoadPosted(LoadPosted),
    /// Start of an operating period; reserved, currently a no-op.
    PeriodStart,
    /// End of an operating period; clears all world state.
    PeriodEnd,
}

impl FeedEventKind {
    /// Stable label for telemetry and logs.
    pub fn label(&self) -> &'static str {
        match self {
            FeedEventKind::TruckPing(_) => "Truck",
            FeedEventKind::LoadPosted(_) => "Load",
            FeedEventKind::PeriodStart => "Start",
            FeedEventKind::PeriodEnd => "End",
        }
    }
}

/// One fully parsed feed event.
#[derive(Debug, Clone, Copy)]
pub struct FeedEvent {
    pub seq: u64,
    pub timestamp: NaiveDateTime,
    pub kind: FeedEventKind,
}

/// The event currently being processed; inserted by the runner before each
/// schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub FeedEvent);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTruck {
    #[serde(default)]
    seq: u64,
    timestamp: String,
    truck_id: u32,
    position_latitude: f64,
    position_longitude: f64,
    equip_type: Equipment,
    next_trip_length_preference: TripPreference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLoad {
    #[serde(default)]
    seq: u64,
    timestamp: String,
    load_id: u64,
    origin_latitude: f64,
    origin_longitude: f64,
    destination_latitude: f64,
    destination_longitude: f64,
    equipment_type: Equipment,
    price: f64,
    mileage: f64,
}

#[derive(Debug, Deserialize)]
struct RawMarker {
    #[serde(default)]
    seq: u64,
    timestamp: String,
}

/// Parse one raw feed message into a [`FeedEvent`].
///
/// The live feed emits timestamps both with and without a UTC offset, so both
/// forms are accepted.
pub fn parse_event(raw: &str) -> Result<FeedEvent, FeedError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let kind = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or(FeedError::MissingType)?;

    match kind {
        "Truck" => {
            let truck: RawTruck = serde_json::from_value(value)?;
            Ok(FeedEvent {
                seq: truck.seq,
                timestamp: parse_timestamp(&truck.timestamp)?,
                kind: FeedEventKind::TruckPing(TruckPing {
                    truck_id: truck.truck_id,
                    position: coordinate(truck.position_latitude, truck.position_longitude)?,
                    equipment: truck.equip_type,
                    preference: truck.next_trip_length_preference,
                }),
            })
        }
        "Load" => {
            let load: RawLoad = serde_json::from_value(value)?;
            Ok(FeedEvent {
                seq: load.seq,
                timestamp: parse_timestamp(&load.timestamp)?,
                kind: FeedEventKind::LoadPosted(LoadPosted {
                    load_id: load.load_id,
                    origin: coordinate(load.origin_latitude, load.origin_longitude)?,
                    destination: coordinate(
                        load.destination_latitude,
                        load.destination_longitude,
                    )?,
                    equipment: load.equipment_type,
                    price: load.price,
                    mileage: load.mileage,
                }),
            })
        }
        "Start" => {
            let marker: RawMarker = serde_json::from_value(value)?;
            Ok(FeedEvent {
                seq: marker.seq,
                timestamp: parse_timestamp(&marker.timestamp)?,
                kind: FeedEventKind::PeriodStart,
            })
        }
        "End" => {
            let marker: RawMarker = serde_json::from_value(value)?;
            Ok(FeedEvent {
                seq: marker.seq,
                timestamp: parse_timestamp(&marker.timestamp)?,
                kind: FeedEventKind::PeriodEnd,
            })
        }
        other => Err(FeedError::UnknownType(other.to_string())),
    }
}

/// Accepts `2023-11-17T08:55:55`, fractional seconds, and RFC 3339 with an
/// offset (normalized to the feed's local wall clock).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, FeedError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| FeedError::BadTimestamp(raw.to_string()))
}

fn coordinate(lat: f64, lng: f64) -> Result<LatLng, FeedError> {
    // LatLng::new only rejects non-finite input; the degree ranges are
    // enforced here.
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(FeedError::InvalidCoordinate { lat, lng });
    }
    LatLng::new(lat, lng).map_err(|_| FeedError::InvalidCoordinate { lat, lng })
}
