pub mod clock;
pub mod config;
pub mod distributions;
pub mod ecs;
pub mod error;
pub mod pathway;
pub mod pools;
pub mod profiling;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod spawner;
pub mod systems;
pub mod telemetry;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
