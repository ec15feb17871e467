//! Patient-flow executor: resumes the bound patient task and runs its program
//! until it suspends on a timer or an ungranted request, or finishes.

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::distributions::{ServiceTimes, SimRng};
use crate::ecs::{HeldUnit, PatientState, PatientTask};
use crate::pathway::{build_program, resolve_claim, Step};
use crate::pools::{ClinicPools, Grant, PoolId};
use crate::routing::ExamRouter;
use crate::scenario::WorkflowPolicy;
use crate::telemetry::PatientLog;

enum Outcome {
    Suspended,
    Finished,
}

#[allow(clippy::too_many_arguments)]
pub fn patient_flow_system(
    mut commands: Commands,
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut pools: ResMut<ClinicPools>,
    mut rng: ResMut<SimRng>,
    router: Res<ExamRouter>,
    policy: Res<WorkflowPolicy>,
    service_times: Res<ServiceTimes>,
    mut log: ResMut<PatientLog>,
    mut tasks: Query<&mut PatientTask>,
) {
    let Some(EventSubject::Patient(entity)) = event.0.subject else {
        return;
    };
    // Take the task out so grants can be delivered to other tasks while it runs.
    let mut task = match tasks.get_mut(entity) {
        Ok(mut slot) => std::mem::take(&mut *slot),
        Err(_) => return,
    };
    if !task.pending.is_empty() {
        tracing::warn!(
            patient_id = task.patient_id,
            state = ?task.state,
            pending = task.pending.len(),
            "resumed while requests are still pending"
        );
        put_back(&mut tasks, entity, task);
        return;
    }

    let now = clock.now();
    if !task.is_routed() {
        let decision = router.route(task.arrival_ts, rng.unit());
        task.patient_type = Some(decision.patient_type);
        task.program = build_program(decision.patient_type, &policy);
        tracing::debug!(
            patient_id = task.patient_id,
            patient_type = decision.patient_type.tag(),
            draw = decision.draw,
            ai_active = decision.ai_active,
            "patient routed"
        );
    }

    let outcome = run_until_suspended(
        entity,
        &mut task,
        now,
        &mut clock,
        &mut pools,
        &mut rng,
        &policy,
        &service_times,
        &mut tasks,
    );

    match outcome {
        Outcome::Suspended => put_back(&mut tasks, entity, task),
        Outcome::Finished => {
            debug_assert!(task.is_finished() && task.held.is_empty());
            let patient_id = task.patient_id;
            if let Some(record) = task.into_record(now) {
                tracing::debug!(
                    patient_id,
                    patient_type = record.patient_type.tag(),
                    time_in_system = record.time_in_system(),
                    "patient exited"
                );
                log.push(record);
            }
            commands.entity(entity).despawn();
        }
    }
}

fn put_back(tasks: &mut Query<&mut PatientTask>, entity: Entity, task: PatientTask) {
    if let Ok(mut slot) = tasks.get_mut(entity) {
        *slot = task;
    }
}

#[allow(clippy::too_many_arguments)]
fn run_until_suspended(
    entity: Entity,
    task: &mut PatientTask,
    now: f64,
    clock: &mut SimulationClock,
    pools: &mut ClinicPools,
    rng: &mut SimRng,
    policy: &WorkflowPolicy,
    service_times: &ServiceTimes,
    tasks: &mut Query<&mut PatientTask>,
) -> Outcome {
    task.state = PatientState::Active;
    loop {
        let Some(step) = task.program.get(task.cursor).cloned() else {
            task.state = PatientState::Done;
            return Outcome::Finished;
        };
        task.cursor += 1;

        match step {
            Step::Acquire(claims) => {
                for claim in claims {
                    let dedicated_in_use = pools.in_use(PoolId::SameVisitRadiologist);
                    let pool = resolve_claim(claim, policy, dedicated_in_use);
                    let request = pools.request(pool, entity);
                    task.held.push(HeldUnit {
                        claim,
                        pool,
                        ticket: request.ticket(),
                    });
                    if !request.is_granted() {
                        task.pending.push(request.ticket());
                    }
                }
                if !task.pending.is_empty() {
                    task.state = PatientState::Waiting;
                    return Outcome::Suspended;
                }
            }
            Step::Got(station) => task.visits.mark_got(station, now),
            Step::Serve(activity) => {
                let duration = service_times.sample(activity, &mut rng.0);
                clock.schedule_in(
                    duration,
                    EventKind::Resume,
                    Some(EventSubject::Patient(entity)),
                );
                task.state = PatientState::InService;
                return Outcome::Suspended;
            }
            Step::Released(station) => task.visits.mark_released(station, now),
            Step::Release(claim) => match task.take_held(claim) {
                Some(unit) => {
                    if let Some(grant) = pools.release(unit.pool, unit.ticket) {
                        deliver_grant(grant, now, clock, tasks);
                    }
                }
                None => tracing::warn!(
                    patient_id = task.patient_id,
                    ?claim,
                    "release without a held unit"
                ),
            },
        }
    }
}

/// Marks the grant on its owner and wakes the owner once it holds everything
/// it asked for.
fn deliver_grant(
    grant: Grant,
    now: f64,
    clock: &mut SimulationClock,
    tasks: &mut Query<&mut PatientTask>,
) {
    let Ok(mut waiter) = tasks.get_mut(grant.owner) else {
        tracing::warn!(ticket = grant.ticket.0, "grant for a missing patient");
        return;
    };
    if waiter.grant(grant.ticket) {
        clock.schedule_at(
            now,
            EventKind::Resume,
            Some(EventSubject::Patient(grant.owner)),
        );
    }
}
