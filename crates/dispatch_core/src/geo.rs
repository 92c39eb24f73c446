//! Great-circle distance on validated lat/lng coordinates.
//!
//! All distance math in the pipeline goes through [`haversine_meters`]; road
//! distance is out of scope and the great-circle approximation is the
//! contracted choice. Coordinates are carried as [`h3o::LatLng`] so that
//! out-of-range latitudes/longitudes are rejected at the feed boundary and
//! never reach the math here.

use h3o::LatLng;

/// Earth radius used by the profit model, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Conversion factor the feed's rate model is calibrated against.
pub const MILES_PER_METER: f64 = 0.000_621_371;

/// Great-circle distance between two points, in meters.
///
/// Symmetric, and zero for identical points.
pub fn haversine_meters(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lng1) = (a.lat().to_radians(), a.lng().to_radians());
    let (lat2, lng2) = (b.lat().to_radians(), b.lng().to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlng = (dlng * 0.5).sin();
    // Rounding can push h fractionally past 1.0 near the antipode, which
    // would make the sqrt below NaN.
    let h = (sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng).clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Great-circle distance in statute miles.
pub fn haversine_miles(a: LatLng, b: LatLng) -> f64 {
    meters_to_miles(haversine_meters(a, b))
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters * MILES_PER_METER
}
