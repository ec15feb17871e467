//! Scenario setup: validate parameters and populate the world with the pools,
//! router, arrival generator and log for one clinic day.

mod build;
mod params;

pub use build::{build_scenario, ScenarioSummary};
pub use params::{
    Capacities, ClinicParams, SimulationEndTime, WorkflowMode, WorkflowPolicy,
};
