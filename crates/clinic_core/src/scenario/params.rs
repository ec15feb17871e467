use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::distributions::ServiceTimes;
use crate::error::ConfigError;
use crate::pools::PoolId;
use crate::routing::{AiPolicy, AiWindow, ExamMix, DEFAULT_OPENING_HOUR, SHARE_SUM_TOLERANCE};
use crate::spawner::{ArrivalMode, ArrivalSchedule};

/// Default clinic day length in hours; arrivals stop after this.
const DEFAULT_STOP_TIME_HOURS: f64 = 9.5;

/// Simulation end time in hours. When set, the runner stops processing events
/// once the next event would be at or after this time.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEndTime(pub f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    /// Screening without AI assessment or same-visit follow-up.
    #[default]
    Baseline,
    /// AI assessment after screening; follow-ups may happen in the same visit.
    SameVisit,
}

/// Which workflow runs and how radiologists are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct WorkflowPolicy {
    pub mode: WorkflowMode,
    /// AI assessments and same-visit reviews use a dedicated radiologist pool.
    pub dedicated_same_visit_radiologist: bool,
    /// Ordinary dx reviews borrow the dedicated radiologist when it is idle.
    pub share_dedicated_with_dx_review: bool,
}

impl WorkflowPolicy {
    pub fn baseline() -> Self {
        Self::default()
    }

    pub fn same_visit() -> Self {
        Self {
            mode: WorkflowMode::SameVisit,
            ..Self::default()
        }
    }

    /// Same-visit workflow with a dedicated radiologist, optionally shared with dx reviews.
    pub fn dedicated(share_with_dx_review: bool) -> Self {
        Self {
            mode: WorkflowMode::SameVisit,
            dedicated_same_visit_radiologist: true,
            share_dedicated_with_dx_review: share_with_dx_review,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dedicated_same_visit_radiologist && self.mode != WorkflowMode::SameVisit {
            return Err(ConfigError::DedicatedRadiologistWithoutSameVisit);
        }
        if self.share_dedicated_with_dx_review && !self.dedicated_same_visit_radiologist {
            return Err(ConfigError::SharedReviewWithoutDedicatedRadiologist);
        }
        Ok(())
    }
}

/// Unit counts for every pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacities {
    pub checkin_staff: u32,
    pub public_wait_room: u32,
    pub consent_staff: u32,
    pub change_room: u32,
    pub gowned_wait_room: u32,
    pub scanner: u32,
    pub us_machine: u32,
    pub radiologist: u32,
    pub same_visit_radiologist: u32,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            checkin_staff: 3,
            public_wait_room: 20,
            consent_staff: 1,
            change_room: 3,
            gowned_wait_room: 5,
            scanner: 3,
            us_machine: 2,
            radiologist: 4,
            same_visit_radiologist: 0,
        }
    }
}

impl Capacities {
    /// Default clinic staffing for `policy`. The same-visit workflow runs with
    /// three general radiologists, plus one dedicated reader when the policy
    /// asks for it.
    pub fn for_policy(policy: &WorkflowPolicy) -> Self {
        match policy.mode {
            WorkflowMode::Baseline => Self::default(),
            WorkflowMode::SameVisit => Self {
                radiologist: 3,
                same_visit_radiologist: u32::from(policy.dedicated_same_visit_radiologist),
                ..Self::default()
            },
        }
    }

    pub fn of(&self, pool: PoolId) -> u32 {
        match pool {
            PoolId::CheckinStaff => self.checkin_staff,
            PoolId::PublicWaitRoom => self.public_wait_room,
            PoolId::ConsentStaff => self.consent_staff,
            PoolId::ChangeRoom => self.change_room,
            PoolId::GownedWaitRoom => self.gowned_wait_room,
            PoolId::Scanner => self.scanner,
            PoolId::UsMachine => self.us_machine,
            PoolId::Radiologist => self.radiologist,
            PoolId::SameVisitRadiologist => self.same_visit_radiologist,
        }
    }

    pub fn of_mut(&mut self, pool: PoolId) -> &mut u32 {
        match pool {
            PoolId::CheckinStaff => &mut self.checkin_staff,
            PoolId::PublicWaitRoom => &mut self.public_wait_room,
            PoolId::ConsentStaff => &mut self.consent_staff,
            PoolId::ChangeRoom => &mut self.change_room,
            PoolId::GownedWaitRoom => &mut self.gowned_wait_room,
            PoolId::Scanner => &mut self.scanner,
            PoolId::UsMachine => &mut self.us_machine,
            PoolId::Radiologist => &mut self.radiologist,
            PoolId::SameVisitRadiologist => &mut self.same_visit_radiologist,
        }
    }
}

/// Parameters for building a clinic scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicParams {
    pub seed: u64,
    pub capacities: Capacities,
    pub workflow: WorkflowPolicy,
    /// Named AI schedule; its referral fraction is sampled at build time.
    pub ai_window: AiWindow,
    /// Explicit AI policy; takes precedence over `ai_window` when set.
    pub ai_policy: Option<AiPolicy>,
    pub opening_hour: u32,
    pub exam_mix: ExamMix,
    pub arrival_rates: ArrivalSchedule,
    pub arrival_mode: ArrivalMode,
    pub service_times: ServiceTimes,
    /// No arrivals after this time (hours).
    pub stop_time: f64,
    pub max_patients: Option<u64>,
    /// Optional hard end; patients still in the clinic are not logged.
    pub end_time: Option<f64>,
}

impl Default for ClinicParams {
    fn default() -> Self {
        Self {
            seed: 42,
            capacities: Capacities::default(),
            workflow: WorkflowPolicy::baseline(),
            ai_window: AiWindow::None,
            ai_policy: None,
            opening_hour: DEFAULT_OPENING_HOUR,
            exam_mix: ExamMix::default(),
            arrival_rates: ArrivalSchedule::default(),
            arrival_mode: ArrivalMode::default(),
            service_times: ServiceTimes::baseline(),
            stop_time: DEFAULT_STOP_TIME_HOURS,
            max_patients: None,
            end_time: None,
        }
    }
}

impl ClinicParams {
    /// Default clinic configured for `workflow`: staffing and service times follow the policy.
    pub fn for_workflow(workflow: WorkflowPolicy) -> Self {
        Self {
            capacities: Capacities::for_policy(&workflow),
            workflow,
            service_times: ServiceTimes::for_mode(workflow.mode),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_ai_window(mut self, window: AiWindow) -> Self {
        self.ai_window = window;
        self
    }

    pub fn with_ai_policy(mut self, policy: AiPolicy) -> Self {
        self.ai_policy = Some(policy);
        self
    }

    pub fn with_exam_mix(mut self, exam_mix: ExamMix) -> Self {
        self.exam_mix = exam_mix;
        self
    }

    pub fn with_arrival_rates(mut self, rates: ArrivalSchedule) -> Self {
        self.arrival_rates = rates;
        self
    }

    pub fn with_arrival_mode(mut self, mode: ArrivalMode) -> Self {
        self.arrival_mode = mode;
        self
    }

    pub fn with_service_times(mut self, times: ServiceTimes) -> Self {
        self.service_times = times;
        self
    }

    pub fn with_capacities(mut self, capacities: Capacities) -> Self {
        self.capacities = capacities;
        self
    }

    pub fn with_stop_time(mut self, hours: f64) -> Self {
        self.stop_time = hours;
        self
    }

    pub fn with_max_patients(mut self, max: u64) -> Self {
        self.max_patients = Some(max);
        self
    }

    pub fn with_end_time(mut self, hours: f64) -> Self {
        self.end_time = Some(hours);
        self
    }

    /// True when AI triage can switch on at some hour of this run.
    pub fn ai_requested(&self) -> bool {
        match &self.ai_policy {
            Some(policy) => policy.is_ever_active(),
            None => self.ai_window != AiWindow::None,
        }
    }

    /// Checks every constraint; nothing is scheduled for a rejected configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.workflow.validate()?;

        if self.ai_requested() && self.workflow.mode != WorkflowMode::SameVisit {
            return Err(ConfigError::AiWithoutSameVisitWorkflow);
        }
        if let Some(policy) = &self.ai_policy {
            let f = policy.referral_fraction;
            if !(0.0..=1.0).contains(&f) {
                return Err(ConfigError::ReferralFractionOutOfRange(f));
            }
        }

        for pool in PoolId::ALL {
            if pool == PoolId::SameVisitRadiologist {
                continue;
            }
            if self.capacities.of(pool) == 0 {
                return Err(ConfigError::NonPositiveCapacity(pool.name()));
            }
        }
        if self.workflow.dedicated_same_visit_radiologist
            && self.capacities.same_visit_radiologist == 0
        {
            return Err(ConfigError::NonPositiveCapacity(
                PoolId::SameVisitRadiologist.name(),
            ));
        }

        if self.exam_mix.0.is_empty() {
            return Err(ConfigError::EmptyExamMix);
        }
        for (hour, shares) in self.exam_mix.0.iter().enumerate() {
            if shares.has_invalid_share() {
                return Err(ConfigError::InvalidExamShare { hour });
            }
            let total = shares.total();
            if !total.is_finite() || (total - 1.0).abs() > SHARE_SUM_TOLERANCE {
                return Err(ConfigError::ExamSharesDoNotSumToOne { hour, total });
            }
        }

        if self.arrival_rates.0.is_empty() {
            return Err(ConfigError::EmptyArrivalSchedule);
        }
        for (hour, rate) in self.arrival_rates.0.iter().enumerate() {
            if !rate.is_finite() || *rate <= 0.0 {
                return Err(ConfigError::NonPositiveArrivalRate { hour, rate: *rate });
            }
        }

        if let Some((activity, dist)) = self.service_times.first_invalid() {
            return Err(ConfigError::InvalidServiceTime {
                activity,
                mean: dist.mean,
                sd: dist.sd,
            });
        }

        if !self.stop_time.is_finite() || self.stop_time <= 0.0 {
            return Err(ConfigError::NonPositiveHorizon(self.stop_time));
        }
        if let Some(end) = self.end_time {
            if !end.is_finite() || end <= 0.0 {
                return Err(ConfigError::NonPositiveHorizon(end));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ExamShares;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ClinicParams::default().validate(), Ok(()));
        for policy in [
            WorkflowPolicy::same_visit(),
            WorkflowPolicy::dedicated(false),
            WorkflowPolicy::dedicated(true),
        ] {
            let params = ClinicParams::for_workflow(policy).with_ai_window(AiWindow::Morning);
            assert_eq!(params.validate(), Ok(()));
        }
    }

    #[test]
    fn same_visit_staffing_uses_three_general_radiologists() {
        let caps = Capacities::for_policy(&WorkflowPolicy::dedicated(false));
        assert_eq!(caps.radiologist, 3);
        assert_eq!(caps.same_visit_radiologist, 1);

        let caps = Capacities::for_policy(&WorkflowPolicy::same_visit());
        assert_eq!(caps.radiologist, 3);
        assert_eq!(caps.same_visit_radiologist, 0);
        assert_eq!(Capacities::for_policy(&WorkflowPolicy::baseline()).radiologist, 4);
    }

    #[test]
    fn rejects_ai_in_baseline_workflow() {
        let params = ClinicParams::default().with_ai_window(AiWindow::Any);
        assert_eq!(
            params.validate(),
            Err(ConfigError::AiWithoutSameVisitWorkflow)
        );
    }

    #[test]
    fn rejects_flag_contradictions() {
        let mut params = ClinicParams::default();
        params.workflow.dedicated_same_visit_radiologist = true;
        assert_eq!(
            params.validate(),
            Err(ConfigError::DedicatedRadiologistWithoutSameVisit)
        );

        let mut params = ClinicParams::for_workflow(WorkflowPolicy::same_visit());
        params.workflow.share_dedicated_with_dx_review = true;
        assert_eq!(
            params.validate(),
            Err(ConfigError::SharedReviewWithoutDedicatedRadiologist)
        );
    }

    #[test]
    fn rejects_bad_mix_rates_and_capacities() {
        let mut shares = ExamShares::default();
        shares.screen_mammo += 0.1;
        let params = ClinicParams::default().with_exam_mix(ExamMix(vec![shares]));
        assert!(matches!(
            params.validate(),
            Err(ConfigError::ExamSharesDoNotSumToOne { hour: 0, .. })
        ));

        let params = ClinicParams::default().with_arrival_rates(ArrivalSchedule(vec![3.0, 0.0]));
        assert!(matches!(
            params.validate(),
            Err(ConfigError::NonPositiveArrivalRate { hour: 1, .. })
        ));

        let mut caps = Capacities::default();
        caps.scanner = 0;
        let params = ClinicParams::default().with_capacities(caps);
        assert_eq!(
            params.validate(),
            Err(ConfigError::NonPositiveCapacity("scanner"))
        );
    }

    #[test]
    fn rejects_nan_and_infinite_exam_shares() {
        for bad in [f64::NAN, f64::INFINITY] {
            let shares = ExamShares {
                dx_mammo_us: bad,
                ..ExamShares::default()
            };
            let mix = ExamMix(vec![ExamShares::default(), shares]);
            let params = ClinicParams::default().with_exam_mix(mix);
            assert_eq!(
                params.validate(),
                Err(ConfigError::InvalidExamShare { hour: 1 })
            );
        }

        let shares = ExamShares {
            other_mri: -0.01,
            screen_mammo: 0.57,
            ..ExamShares::default()
        };
        let params = ClinicParams::default().with_exam_mix(ExamMix(vec![shares]));
        assert_eq!(
            params.validate(),
            Err(ConfigError::InvalidExamShare { hour: 0 })
        );
    }

    #[test]
    fn rejects_referral_fraction_out_of_range() {
        let params = ClinicParams::for_workflow(WorkflowPolicy::same_visit())
            .with_ai_policy(AiPolicy::always(10, 1.5));
        assert_eq!(
            params.validate(),
            Err(ConfigError::ReferralFractionOutOfRange(1.5))
        );
    }
}
