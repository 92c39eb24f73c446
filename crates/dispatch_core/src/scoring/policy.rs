//! The two named scoring policies and their weight vectors.
//!
//! Which policy applies is a function of how many loads are active: with
//! enough loads to cluster reliably, `ClusteredPolicy` spends a tenth of the
//! weight on isolation proximity; below the threshold `SimplePolicy`
//! redistributes that weight onto trip-length preference. Both vectors sum
//! to 1.0.

use chrono::NaiveDateTime;
use h3o::LatLng;

use crate::ecs::{LoadDetails, NotificationState, TripPreference};
use crate::isolation::IsolationModel;
use crate::scoring::heuristic::{idle_hours, idle_score, preference_score, profit_score};

/// Weight vector over the sub-scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub profit: f64,
    pub preference: f64,
    pub idle: f64,
    pub cluster: f64,
}

impl ScoreWeights {
    pub const fn clustered() -> Self {
        Self {
            profit: 0.5,
            preference: 0.2,
            idle: 0.2,
            cluster: 0.1,
        }
    }

    pub const fn simple() -> Self {
        Self {
            profit: 0.5,
            preference: 0.3,
            idle: 0.2,
            cluster: 0.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.profit + self.preference + self.idle + self.cluster
    }
}

/// Everything a policy needs to score one truck against one load.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub load: &'a LoadDetails,
    /// Resolved truck → load-origin distance in miles.
    pub candidate_miles: f64,
    pub truck_position: LatLng,
    pub preference: TripPreference,
    pub last_seen: NaiveDateTime,
    pub notification_state: NotificationState,
    pub now: NaiveDateTime,
    /// Present only when enough loads are active to cluster.
    pub isolation: Option<&'a IsolationModel>,
    pub rate_per_mile: f64,
}

/// Weighted total plus the profit sub-score, retained for diagnostics and
/// the notification payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub total: f64,
    pub profit: f64,
}

impl ScoreBreakdown {
    /// The hard business rule: unprofitable matches score zero outright.
    fn unprofitable(profit: f64) -> Self {
        Self { total: 0.0, profit }
    }
}

pub trait ScoringPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn weights(&self) -> ScoreWeights;
    fn score(&self, input: &ScoringInput<'_>) -> ScoreBreakdown;
}

/// Policy applied when the active-load count reaches the clustering
/// threshold: profit 0.5, preference 0.2, idle 0.2, cluster 0.1.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClusteredPolicy;

/// Policy applied below the clustering threshold: profit 0.5,
/// preference 0.3, idle 0.2.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimplePolicy;

impl ScoringPolicy for ClusteredPolicy {
    fn name(&self) -> &'static str {
        "clustered"
    }

    fn weights(&self) -> ScoreWeights {
        ScoreWeights::clustered()
    }

    fn score(&self, input: &ScoringInput<'_>) -> ScoreBreakdown {
        let weights = self.weights();
        let profit = profit_score(
            input.load.price,
            input.load.mileage,
            input.candidate_miles,
            input.rate_per_mile,
        );
        if profit * weights.profit <= 0.0 {
            return ScoreBreakdown::unprofitable(profit);
        }

        let preference = preference_score(input.preference, input.load.mileage);
        let idle = idle_score(idle_hours(
            input.notification_state,
            input.last_seen,
            input.now,
        ));
        let cluster = input
            .isolation
            .map(|model| model.proximity_score(input.truck_position, input.load.destination))
            .unwrap_or(0.0);

        ScoreBreakdown {
            total: profit * weights.profit
                + preference * weights.preference
                + idle * weights.idle
                + cluster * weights.cluster,
            profit,
        }
    }
}

impl ScoringPolicy for SimplePolicy {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn weights(&self) -> ScoreWeights {
        ScoreWeights::simple()
    }

    fn score(&self, input: &ScoringInput<'_>) -> ScoreBreakdown {
        let weights = self.weights();
        let profit = profit_score(
            input.load.price,
            input.load.mileage,
            input.candidate_miles,
            input.rate_per_mile,
        );
        if profit * weights.profit <= 0.0 {
            return ScoreBreakdown::unprofitable(profit);
        }

        let preference = preference_score(input.preference, input.load.mileage);
        let idle = idle_score(idle_hours(
            input.notification_state,
            input.last_seen,
            input.now,
        ));

        ScoreBreakdown {
            total: profit * weights.profit
                + preference * weights.preference
                + idle * weights.idle,
            profit,
        }
    }
}

/// Select the policy for the current active-load count.
pub fn policy_for(active_loads: usize, clustering_threshold: usize) -> &'static dyn ScoringPolicy {
    if active_loads >= clustering_threshold {
        &ClusteredPolicy
    } else {
        &SimplePolicy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Equipment;

    fn ts(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").expect("timestamp")
    }

    fn point(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng).expect("valid coordinate")
    }

    fn flatbed_load() -> LoadDetails {
        LoadDetails {
            origin: point(29.9561, -90.0773),
            destination: point(33.6821, -84.1488),
            equipment: Equipment::Flatbed,
            price: 1000.0,
            mileage: 480.0,
            posted_at: ts("2023-11-17T08:55:55"),
        }
    }

    fn input<'a>(load: &'a LoadDetails, candidate_miles: f64) -> ScoringInput<'a> {
        ScoringInput {
            load,
            candidate_miles,
            truck_position: point(30.0, -90.0),
            preference: TripPreference::Long,
            last_seen: ts("2023-11-17T08:55:55"),
            notification_state: NotificationState::NeverNotified,
            now: ts("2023-11-17T08:55:55"),
            isolation: None,
            rate_per_mile: 1.38,
        }
    }

    #[test]
    fn both_weight_vectors_sum_to_one() {
        assert!((ScoreWeights::clustered().sum() - 1.0).abs() < 1e-12);
        assert!((ScoreWeights::simple().sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn worked_example_keeps_scoring_past_the_profit_gate() {
        // profit = 1000 - 480*1.38 - 50*1.38 = 268.6 -> sub-score 0.2686,
        // weighted 0.1343 > 0.
        let load = flatbed_load();
        let breakdown = SimplePolicy.score(&input(&load, 50.0));
        assert!((breakdown.profit - 0.2686).abs() < 1e-9);
        // preference matches (Long/Long): + 5 * 0.3; idle is zero.
        assert!((breakdown.total - (0.2686 * 0.5 + 5.0 * 0.3)).abs() < 1e-9);
    }

    #[test]
    fn unprofitable_match_short_circuits_to_zero() {
        let mut load = flatbed_load();
        load.price = 600.0; // 600 - 662.4 - ... < 0
        for policy in [&ClusteredPolicy as &dyn ScoringPolicy, &SimplePolicy] {
            let breakdown = policy.score(&input(&load, 50.0));
            assert_eq!(breakdown.total, 0.0, "{}", policy.name());
            assert!(breakdown.profit < 0.0);
        }
    }

    #[test]
    fn exactly_break_even_profit_also_short_circuits() {
        let mut load = flatbed_load();
        // price exactly covers mileage + deadhead cost.
        load.price = 480.0 * 1.38 + 50.0 * 1.38;
        let breakdown = SimplePolicy.score(&input(&load, 50.0));
        assert_eq!(breakdown.total, 0.0);
    }

    #[test]
    fn clustered_policy_counts_isolation_proximity() {
        let origins = vec![
            point(33.68, -84.14),
            point(33.70, -84.10),
            point(33.65, -84.20),
        ];
        let model = IsolationModel::from_load_origins(&origins, 50.0, 3, 200.0);
        let load = flatbed_load();

        let mut isolated = input(&load, 50.0);
        isolated.truck_position = point(46.8, -110.3); // far from the cluster
        isolated.isolation = Some(&model);

        let mut near = isolated;
        near.truck_position = point(33.7, -84.1);

        let isolated_score = ClusteredPolicy.score(&isolated);
        let near_score = ClusteredPolicy.score(&near);
        assert!(isolated_score.total > near_score.total);
    }

    #[test]
    fn policy_threshold_selects_by_active_load_count() {
        assert_eq!(policy_for(4, 5).name(), "simple");
        assert_eq!(policy_for(5, 5).name(), "clustered");
        assert_eq!(policy_for(12, 5).name(), "clustered");
    }

    #[test]
    fn longer_idle_scores_higher() {
        let load = flatbed_load();
        let mut fresh = input(&load, 50.0);
        fresh.now = ts("2023-11-17T09:00:00");

        let mut stale = fresh;
        stale.last_seen = ts("2023-11-15T09:00:00");

        assert!(SimplePolicy.score(&stale).total > SimplePolicy.score(&fresh).total);
    }
}
