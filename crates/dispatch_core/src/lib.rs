pub mod clustering;
pub mod config;
pub mod ecs;
pub mod error;
pub mod feed;
pub mod geo;
pub mod isolation;
pub mod refine;
pub mod registry;
pub mod runner;
pub mod scoring;
pub mod selection;
pub mod store;
pub mod systems;
pub mod telemetry;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
