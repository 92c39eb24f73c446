//! Sub-score formulas shared by both scoring policies.

use chrono::NaiveDateTime;

use crate::ecs::{NotificationState, TripPreference};

/// Mileage at or above which a load counts as a long trip.
pub const LONG_TRIP_MILEAGE: f64 = 200.0;

/// Preference sub-score when the truck's stated preference matches the load.
pub const PREFERENCE_MATCH_SCORE: f64 = 5.0;

/// Idle time beyond this horizon earns no additional score.
pub const IDLE_HORIZON_HOURS: f64 = 48.0;

/// Upper bound of the idle sub-score.
pub const IDLE_SCORE_MAX: f64 = 5.0;

/// A load is Long when its mileage reaches [`LONG_TRIP_MILEAGE`].
pub fn load_trip_length(mileage: f64) -> TripPreference {
    if mileage >= LONG_TRIP_MILEAGE {
        TripPreference::Long
    } else {
        TripPreference::Short
    }
}

/// Estimated profit scaled for weighting: price minus the per-mile rate over
/// both the load's mileage and the truck's deadhead to the origin, divided
/// by 1000. Can be negative; the policies short-circuit on that.
pub fn profit_score(price: f64, mileage: f64, candidate_miles: f64, rate_per_mile: f64) -> f64 {
    (price - mileage * rate_per_mile - candidate_miles * rate_per_mile) / 1000.0
}

/// 5 when the truck's trip-length preference matches the load, else 0.
pub fn preference_score(preference: TripPreference, mileage: f64) -> f64 {
    if preference == load_trip_length(mileage) {
        PREFERENCE_MATCH_SCORE
    } else {
        0.0
    }
}

/// Hours the truck has gone without a notification, measured from the last
/// notification when one exists, otherwise from the last feed sighting.
pub fn idle_hours(state: NotificationState, last_seen: NaiveDateTime, now: NaiveDateTime) -> f64 {
    let since = match state {
        NotificationState::NotifiedAt(t) => t,
        NotificationState::NeverNotified => last_seen,
    };
    ((now - since).num_seconds().max(0) as f64) / 3600.0
}

/// Idle sub-score in [0, IDLE_SCORE_MAX]: proportional to idle hours, capped
/// at the 48-hour horizon. Longer idle rewards under-served trucks.
pub fn idle_score(hours: f64) -> f64 {
    hours.clamp(0.0, IDLE_HORIZON_HOURS) / IDLE_HORIZON_HOURS * IDLE_SCORE_MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").expect("timestamp")
    }

    #[test]
    fn profit_matches_worked_example() {
        // price 1000, mileage 480, deadhead 50 miles at $1.38/mile.
        let score = profit_score(1000.0, 480.0, 50.0, 1.38);
        assert!((score - 0.2686).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn mileage_480_is_a_long_trip() {
        assert_eq!(load_trip_length(480.0), TripPreference::Long);
        assert_eq!(load_trip_length(199.9), TripPreference::Short);
        assert_eq!(load_trip_length(200.0), TripPreference::Long);
    }

    #[test]
    fn preference_scores_only_exact_matches() {
        assert_eq!(preference_score(TripPreference::Long, 480.0), 5.0);
        assert_eq!(preference_score(TripPreference::Short, 480.0), 0.0);
        assert_eq!(preference_score(TripPreference::Short, 120.0), 5.0);
    }

    #[test]
    fn idle_hours_prefers_notification_timestamp() {
        let seen = ts("2023-11-17T00:00:00");
        let notified = ts("2023-11-17T06:00:00");
        let now = ts("2023-11-17T12:00:00");
        assert_eq!(
            idle_hours(NotificationState::NotifiedAt(notified), seen, now),
            6.0
        );
        assert_eq!(idle_hours(NotificationState::NeverNotified, seen, now), 12.0);
    }

    #[test]
    fn idle_score_caps_at_horizon() {
        assert_eq!(idle_score(0.0), 0.0);
        assert_eq!(idle_score(24.0), 2.5);
        assert_eq!(idle_score(48.0), 5.0);
        assert_eq!(idle_score(300.0), 5.0);
    }
}
