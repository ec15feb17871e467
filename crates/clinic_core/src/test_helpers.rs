//! Test helpers for common test setup and utilities.
//!
//! Worlds built here skip the arrival generator; patients are spawned directly
//! with a program and woken at their arrival time.

use bevy_ecs::prelude::{Entity, World};

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::distributions::{ServiceTimes, SimRng};
use crate::ecs::PatientTask;
use crate::pathway::{build_program, Step};
use crate::pools::{ClinicPools, PoolId};
use crate::profiling::EventMetrics;
use crate::routing::{AiPolicy, ExamMix, ExamRouter, PatientType};
use crate::scenario::{Capacities, WorkflowPolicy};
use crate::telemetry::PatientLog;

/// Seed used by helper worlds unless a test overrides it.
pub const TEST_SEED: u64 = 7;

/// A world with every resource the patient-flow system needs, using
/// deterministic service times of `service_hours` for every activity.
pub fn create_test_world(
    capacities: Capacities,
    policy: WorkflowPolicy,
    service_hours: f64,
) -> World {
    let mut world = World::new();
    world.insert_resource(SimulationClock::default());
    world.insert_resource(ClinicPools::new(|pool| capacities.of(pool)));
    world.insert_resource(ExamRouter::new(ExamMix::default(), AiPolicy::disabled()));
    world.insert_resource(policy);
    world.insert_resource(ServiceTimes::fixed(service_hours));
    world.insert_resource(SimRng::seeded(TEST_SEED));
    world.insert_resource(PatientLog::default());
    world.insert_resource(EventMetrics::default());
    world
}

/// Capacities with one unit in every pool.
pub fn single_unit_capacities() -> Capacities {
    let mut capacities = Capacities::default();
    for pool in PoolId::ALL {
        *capacities.of_mut(pool) = 1;
    }
    capacities
}

/// Spawns a patient running `program` and wakes it at `arrival_ts`.
pub fn spawn_scripted_patient(
    world: &mut World,
    patient_id: u64,
    arrival_ts: f64,
    patient_type: PatientType,
    program: Vec<Step>,
) -> Entity {
    let entity = world
        .spawn(PatientTask::scripted(
            patient_id,
            arrival_ts,
            patient_type,
            program,
        ))
        .id();
    world.resource_mut::<SimulationClock>().schedule_at(
        arrival_ts,
        EventKind::Resume,
        Some(EventSubject::Patient(entity)),
    );
    entity
}

/// Spawns a patient on its full pathway under the world's workflow policy.
pub fn spawn_pathway_patient(
    world: &mut World,
    patient_id: u64,
    arrival_ts: f64,
    patient_type: PatientType,
) -> Entity {
    let program = build_program(patient_type, world.resource::<WorkflowPolicy>());
    spawn_scripted_patient(world, patient_id, arrival_ts, patient_type, program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_unit_capacities_cover_every_pool() {
        let capacities = single_unit_capacities();
        for pool in PoolId::ALL {
            assert_eq!(capacities.of(pool), 1, "{}", pool.name());
        }
    }

    #[test]
    fn scripted_patient_is_woken_at_arrival() {
        let mut world = create_test_world(
            Capacities::default(),
            WorkflowPolicy::baseline(),
            1.0,
        );
        let entity = spawn_pathway_patient(&mut world, 1, 0.25, PatientType::ScreenMammo);
        let task = world.entity(entity).get::<PatientTask>().expect("task");
        assert!(task.is_routed());
        assert!(!task.program.is_empty());
        assert_eq!(
            world.resource::<SimulationClock>().next_event_time(),
            Some(0.25)
        );
    }
}
