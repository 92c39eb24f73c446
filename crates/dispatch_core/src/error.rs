//! Error types for the feed boundary, distance refinement, and the
//! notification store.

use thiserror::Error;

/// A feed payload that cannot be turned into a [`crate::feed::FeedEvent`].
///
/// All variants are non-fatal: the event is logged and dropped without
/// touching world state.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed feed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feed payload missing `type` discriminator")]
    MissingType,
    #[error("unrecognized feed event type `{0}`")]
    UnknownType(String),
    #[error("unparseable timestamp `{0}`")]
    BadTimestamp(String),
    #[error("coordinate out of range: lat {lat}, lng {lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

/// Failure while resolving the exact distance for a candidate truck.
///
/// One failed candidate aborts the whole load's refinement batch; partial
/// distances never reach scoring.
#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("distance resolution failed: {0}")]
    Resolution(String),
}

/// Failure talking to the external notification store.
///
/// Fatal only to the affected truck's notification; in-memory state stays
/// consistent and the next event can still be processed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store mutex poisoned")]
    Poisoned,
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
    #[error("store payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}
