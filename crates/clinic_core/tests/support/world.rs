use bevy_ecs::prelude::World;
use clinic_core::pools::PoolId;
use clinic_core::scenario::{Capacities, WorkflowPolicy};
use clinic_core::test_helpers::create_test_world;

/// Builder for patient-flow worlds with deterministic service times.
#[derive(Debug, Clone)]
pub struct TestWorldBuilder {
    capacities: Capacities,
    policy: WorkflowPolicy,
    service_hours: f64,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self {
            capacities: Capacities::default(),
            policy: WorkflowPolicy::baseline(),
            service_hours: 1.0,
        }
    }
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, pool: PoolId, units: u32) -> Self {
        *self.capacities.of_mut(pool) = units;
        self
    }

    pub fn with_policy(mut self, policy: WorkflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Every activity takes exactly `hours`.
    pub fn with_service_hours(mut self, hours: f64) -> Self {
        self.service_hours = hours;
        self
    }

    pub fn build(self) -> World {
        create_test_world(self.capacities, self.policy, self.service_hours)
    }
}
