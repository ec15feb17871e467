use bevy_ecs::prelude::World;

use crate::clock::SimulationClock;
use crate::distributions::SimRng;
use crate::error::ConfigError;
use crate::pools::ClinicPools;
use crate::profiling::EventMetrics;
use crate::routing::{AiPolicy, ExamRouter};
use crate::scenario::params::{ClinicParams, SimulationEndTime};
use crate::spawner::ArrivalGenerator;
use crate::telemetry::PatientLog;

/// What [build_scenario] resolved, mainly the sampled AI policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    pub seed: u64,
    pub ai_policy: AiPolicy,
}

/// Validates `params` and inserts every resource a run needs. Nothing is
/// inserted when validation fails.
pub fn build_scenario(
    world: &mut World,
    params: ClinicParams,
) -> Result<ScenarioSummary, ConfigError> {
    params.validate()?;

    let mut rng = SimRng::seeded(params.seed);
    let hours = params.exam_mix.hours().max(params.arrival_rates.hours());
    let ai_policy = match params.ai_policy.clone() {
        Some(policy) => policy,
        None => params
            .ai_window
            .sample_policy(params.opening_hour, hours, &mut rng.0),
    };

    let capacities = params.capacities;
    world.insert_resource(SimulationClock::default());
    world.insert_resource(ClinicPools::new(|pool| capacities.of(pool)));
    world.insert_resource(ExamRouter::new(params.exam_mix.clone(), ai_policy.clone()));
    world.insert_resource(params.workflow);
    world.insert_resource(params.service_times);
    world.insert_resource(ArrivalGenerator::new(
        params.arrival_rates.clone(),
        params.arrival_mode,
        params.stop_time,
        params.max_patients,
    ));
    world.insert_resource(PatientLog::default());
    world.insert_resource(EventMetrics::default());
    if let Some(end) = params.end_time {
        world.insert_resource(SimulationEndTime(end));
    }
    world.insert_resource(rng);

    tracing::info!(
        seed = params.seed,
        workflow = ?params.workflow.mode,
        dedicated_radiologist = params.workflow.dedicated_same_visit_radiologist,
        ai_active_hours = ai_policy.enabled_hours.iter().filter(|on| **on).count(),
        referral_fraction = ai_policy.referral_fraction,
        "clinic scenario built"
    );

    Ok(ScenarioSummary {
        seed: params.seed,
        ai_policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::AiWindow;
    use crate::scenario::WorkflowPolicy;

    #[test]
    fn rejected_params_leave_world_empty() {
        let mut world = World::new();
        let params = ClinicParams::default().with_ai_window(AiWindow::Any);
        assert!(build_scenario(&mut world, params).is_err());
        assert!(world.get_resource::<SimulationClock>().is_none());
        assert!(world.get_resource::<ClinicPools>().is_none());
    }

    #[test]
    fn ai_window_is_sampled_once() {
        let mut world = World::new();
        let params = ClinicParams::for_workflow(WorkflowPolicy::same_visit())
            .with_ai_window(AiWindow::Afternoon)
            .with_seed(3);
        let summary = build_scenario(&mut world, params).expect("valid");
        let on: Vec<usize> = (0..10)
            .filter(|h| summary.ai_policy.is_active(*h))
            .collect();
        assert_eq!(on, vec![6, 7, 8]);
        assert_eq!(world.resource::<ExamRouter>().ai, summary.ai_policy);
    }
}
