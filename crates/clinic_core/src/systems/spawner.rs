use bevy_ecs::prelude::{Commands, ResMut};

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::distributions::SimRng;
use crate::ecs::PatientTask;
use crate::spawner::ArrivalGenerator;

/// Schedules the first arrival of the day.
pub fn simulation_started_system(
    mut clock: ResMut<SimulationClock>,
    mut generator: ResMut<ArrivalGenerator>,
    mut rng: ResMut<SimRng>,
) {
    let now = clock.now();
    if let Some(at) = generator.first_arrival(now, &mut rng.0) {
        clock.schedule_at(at, EventKind::PatientArrival, None);
    }
}

/// Spawns the arriving patient, wakes it immediately and schedules the next arrival.
pub fn patient_arrival_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    mut generator: ResMut<ArrivalGenerator>,
    mut rng: ResMut<SimRng>,
) {
    let now = clock.now();
    if !generator.admits(now) {
        return;
    }

    let patient_id = generator.record_spawn();
    let entity = commands.spawn(PatientTask::new(patient_id, now)).id();
    clock.schedule_at(
        now,
        EventKind::Resume,
        Some(EventSubject::Patient(entity)),
    );
    tracing::trace!(patient_id, at = now, "patient arrived");

    match generator.next_arrival(now, &mut rng.0) {
        Some(at) => {
            clock.schedule_at(at, EventKind::PatientArrival, None);
        }
        None => tracing::debug!(
            spawned = generator.spawned_count(),
            stop_time = generator.stop_time(),
            at = now,
            "arrivals closed"
        ),
    }
}
