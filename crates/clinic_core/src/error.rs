use thiserror::Error;

use crate::distributions::Activity;

/// Reasons a clinic configuration is rejected before the run starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("pool `{0}` must have a positive capacity")]
    NonPositiveCapacity(&'static str),

    #[error("exam mix has no hours")]
    EmptyExamMix,

    #[error("exam shares for hour {hour} sum to {total}, expected 1.0")]
    ExamSharesDoNotSumToOne { hour: usize, total: f64 },

    #[error("exam shares for hour {hour} contain a negative or non-finite value")]
    InvalidExamShare { hour: usize },

    #[error("arrival schedule has no hours")]
    EmptyArrivalSchedule,

    #[error("arrival rate {rate} for hour {hour} must be positive")]
    NonPositiveArrivalRate { hour: usize, rate: f64 },

    #[error("AI triage requires the same-visit workflow")]
    AiWithoutSameVisitWorkflow,

    #[error("a dedicated same-visit radiologist requires the same-visit workflow")]
    DedicatedRadiologistWithoutSameVisit,

    #[error("sharing the dedicated radiologist requires a dedicated radiologist")]
    SharedReviewWithoutDedicatedRadiologist,

    #[error("AI referral fraction {0} is outside [0, 1]")]
    ReferralFractionOutOfRange(f64),

    #[error("service time for {activity:?} has invalid parameters (mean {mean}, sd {sd})")]
    InvalidServiceTime { activity: Activity, mean: f64, sd: f64 },

    #[error("time horizon {0} must be positive")]
    NonPositiveHorizon(f64),
}
