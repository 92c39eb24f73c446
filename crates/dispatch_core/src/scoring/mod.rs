pub mod heuristic;
pub mod policy;

pub use policy::{
    policy_for, ClusteredPolicy, ScoreBreakdown, ScoreWeights, ScoringInput, ScoringPolicy,
    SimplePolicy,
};
