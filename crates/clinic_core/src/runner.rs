//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression happens here, outside systems. Each step pops the next
//! event from [SimulationClock], inserts it as [CurrentEvent], then runs the
//! schedule so that exactly the systems for that event kind execute.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::ecs::PatientTask;
use crate::error::ConfigError;
use crate::profiling::EventMetrics;
use crate::routing::AiPolicy;
use crate::scenario::{build_scenario, ClinicParams, SimulationEndTime};
use crate::systems::{
    patient_flow::patient_flow_system,
    spawner::{patient_arrival_system, simulation_started_system},
};
use crate::telemetry::{PatientLog, PatientRecord};

/// Upper bound on events processed by [run_scenario].
pub const MAX_STEPS: usize = 10_000_000;

fn is_simulation_started(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SimulationStarted)
        .unwrap_or(false)
}

fn is_patient_arrival(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::PatientArrival)
        .unwrap_or(false)
}

fn is_resume(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::Resume)
        .unwrap_or(false)
}

/// Pops the next event unless the queue is empty or the event lies at or past
/// `limit`.
fn pop_before(world: &mut World, limit: Option<f64>) -> Option<Event> {
    let next_ts = world
        .get_resource::<SimulationClock>()
        .and_then(|c| c.next_event_time())?;
    if let Some(end) = limit {
        if next_ts >= end {
            return None;
        }
    }
    world.resource_mut::<SimulationClock>().pop_next()
}

fn dispatch(world: &mut World, schedule: &mut Schedule, event: Event) {
    tracing::trace!(at = event.timestamp, kind = ?event.kind, "event");
    world.insert_resource(CurrentEvent(event));
    if let Some(mut metrics) = world.get_resource_mut::<EventMetrics>() {
        metrics.record_event(event.kind, event.timestamp);
    }
    schedule.run(world);
}

/// Runs one simulation step. Returns `false` if the clock was empty or the next
/// event is at or past [SimulationEndTime] (when that resource is present).
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let end = world.get_resource::<SimulationEndTime>().map(|e| e.0);
    match pop_before(world, end) {
        Some(event) => {
            dispatch(world, schedule, event);
            true
        }
        None => false,
    }
}

/// Runs one simulation step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let end = world.get_resource::<SimulationEndTime>().map(|e| e.0);
    match pop_before(world, end) {
        Some(event) => {
            dispatch(world, schedule, event);
            hook(world, &event);
            true
        }
        None => false,
    }
}

/// Runs simulation steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Runs every event strictly before `until` (and before [SimulationEndTime],
/// whichever is earlier). Later events stay queued.
pub fn run_until(world: &mut World, schedule: &mut Schedule, until: f64, max_steps: usize) -> usize {
    let end = world.get_resource::<SimulationEndTime>().map(|e| e.0);
    let limit = end.map_or(until, |end| end.min(until));
    let mut steps = 0;
    while steps < max_steps {
        let Some(event) = pop_before(world, Some(limit)) else {
            break;
        };
        dispatch(world, schedule, event);
        steps += 1;
    }
    steps
}

/// Builds the simulation schedule: one system per event kind plus
/// [apply_deferred] so spawned and despawned patients are applied before the
/// next step.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            simulation_started_system.run_if(is_simulation_started),
            patient_arrival_system.run_if(is_patient_arrival),
            patient_flow_system.run_if(is_resume),
            apply_deferred,
        )
            .chain(),
    );
    schedule
}

/// Schedules SimulationStarted at time 0. Call after [build_scenario].
pub fn initialize_simulation(world: &mut World) {
    let mut clock = world.resource_mut::<SimulationClock>();
    clock.schedule_at(0.0, EventKind::SimulationStarted, None);
}

/// Result of one complete run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Records in exit order.
    pub records: Vec<PatientRecord>,
    pub steps: usize,
    /// Virtual time of the last processed event.
    pub end_time: f64,
    pub ai_policy: AiPolicy,
    /// Patients still in the clinic when the run stopped.
    pub unfinished: usize,
}

/// Builds a world from `params`, runs it to completion and drains the log.
pub fn run_scenario(params: ClinicParams) -> Result<RunOutcome, ConfigError> {
    let mut world = World::new();
    let summary = build_scenario(&mut world, params)?;
    initialize_simulation(&mut world);

    let mut schedule = simulation_schedule();
    let steps = run_until_empty(&mut world, &mut schedule, MAX_STEPS);
    if steps == MAX_STEPS {
        tracing::warn!(steps, "run stopped at the step limit");
    }

    let end_time = world.resource::<SimulationClock>().now();
    let unfinished = world.query::<&PatientTask>().iter(&world).count();
    let records = world.resource_mut::<PatientLog>().drain();
    world.resource::<EventMetrics>().log_summary();
    tracing::info!(
        seed = summary.seed,
        patients = records.len(),
        unfinished,
        end_time,
        "clinic run complete"
    );

    Ok(RunOutcome {
        records,
        steps,
        end_time,
        ai_policy: summary.ai_policy,
        unfinished,
    })
}
