//! Random draws: service durations, inter-arrival gaps and the shared RNG.
//!
//! A run consumes a single seeded stream so the same seed always reproduces
//! the same patient log.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};

use crate::scenario::WorkflowMode;

/// Draws below this are never used as a service time.
pub const MIN_SERVICE_HOURS: f64 = 1.0e-4;

/// Non-positive Normal draws are retried this many times before clamping.
const MAX_RESAMPLES: usize = 32;

/// Seeded random stream shared by every system of one run.
#[derive(Debug, Resource)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Timed activities a patient can be served for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Checkin,
    PublicWait,
    Consent,
    ChangeRoom,
    GownedWait,
    ScreenMammo,
    DxMammo,
    DxUs,
    UsGuidedBiopsy,
    MammoGuidedBiopsy,
    AiAssess,
    ScreenUs,
    MriGuidedBiopsy,
    RadiologistReview,
}

/// Normal(mean, sd) duration in hours. A zero `sd` yields the mean exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceDistribution {
    pub mean: f64,
    pub sd: f64,
}

impl ServiceDistribution {
    pub const fn normal(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }

    pub const fn fixed(hours: f64) -> Self {
        Self { mean: hours, sd: 0.0 }
    }

    pub fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.mean > 0.0 && self.sd.is_finite() && self.sd >= 0.0
    }

    /// Samples a strictly positive duration: non-positive draws are resampled a
    /// bounded number of times, then clamped to [MIN_SERVICE_HOURS].
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.sd == 0.0 {
            return self.mean.max(MIN_SERVICE_HOURS);
        }
        let Ok(normal) = Normal::new(self.mean, self.sd) else {
            return self.mean.max(MIN_SERVICE_HOURS);
        };
        let mut draw = normal.sample(rng);
        for _ in 0..MAX_RESAMPLES {
            if draw > 0.0 {
                return draw.max(MIN_SERVICE_HOURS);
            }
            draw = normal.sample(rng);
        }
        draw.max(MIN_SERVICE_HOURS)
    }
}

/// Duration distributions for every [Activity].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct ServiceTimes {
    pub checkin: ServiceDistribution,
    pub public_wait: ServiceDistribution,
    pub consent: ServiceDistribution,
    pub change_room: ServiceDistribution,
    pub gowned_wait: ServiceDistribution,
    pub screen_mammo: ServiceDistribution,
    pub dx_mammo: ServiceDistribution,
    pub dx_us: ServiceDistribution,
    pub us_guided_biopsy: ServiceDistribution,
    pub mammo_guided_biopsy: ServiceDistribution,
    pub ai_assess: ServiceDistribution,
    pub screen_us: ServiceDistribution,
    pub mri_guided_biopsy: ServiceDistribution,
    pub radiologist_review: ServiceDistribution,
}

impl Default for ServiceTimes {
    fn default() -> Self {
        Self::baseline()
    }
}

impl ServiceTimes {
    /// Clinic timings without same-visit follow-up.
    pub fn baseline() -> Self {
        Self {
            checkin: ServiceDistribution::normal(0.05, 0.01),
            public_wait: ServiceDistribution::normal(0.17, 0.034),
            consent: ServiceDistribution::normal(0.17, 0.034),
            change_room: ServiceDistribution::normal(0.03, 0.006),
            gowned_wait: ServiceDistribution::normal(0.017, 0.0034),
            screen_mammo: ServiceDistribution::normal(0.17, 0.034),
            dx_mammo: ServiceDistribution::normal(0.417, 0.0834),
            dx_us: ServiceDistribution::normal(0.417, 0.0834),
            us_guided_biopsy: ServiceDistribution::normal(0.75, 0.15),
            mammo_guided_biopsy: ServiceDistribution::normal(0.75, 0.15),
            ai_assess: ServiceDistribution::normal(0.25, 0.05),
            screen_us: ServiceDistribution::normal(0.25, 0.05),
            mri_guided_biopsy: ServiceDistribution::normal(0.5, 0.1),
            radiologist_review: ServiceDistribution::normal(0.083, 0.017),
        }
    }

    /// Same-visit workflow timings; mammography-guided biopsies run longer.
    pub fn same_visit() -> Self {
        Self {
            mammo_guided_biopsy: ServiceDistribution::normal(1.25, 0.25),
            ..Self::baseline()
        }
    }

    pub fn for_mode(mode: WorkflowMode) -> Self {
        match mode {
            WorkflowMode::Baseline => Self::baseline(),
            WorkflowMode::SameVisit => Self::same_visit(),
        }
    }

    /// Every activity takes exactly `hours`.
    pub fn fixed(hours: f64) -> Self {
        let d = ServiceDistribution::fixed(hours);
        Self {
            checkin: d,
            public_wait: d,
            consent: d,
            change_room: d,
            gowned_wait: d,
            screen_mammo: d,
            dx_mammo: d,
            dx_us: d,
            us_guided_biopsy: d,
            mammo_guided_biopsy: d,
            ai_assess: d,
            screen_us: d,
            mri_guided_biopsy: d,
            radiologist_review: d,
        }
    }

    pub fn get(&self, activity: Activity) -> &ServiceDistribution {
        match activity {
            Activity::Checkin => &self.checkin,
            Activity::PublicWait => &self.public_wait,
            Activity::Consent => &self.consent,
            Activity::ChangeRoom => &self.change_room,
            Activity::GownedWait => &self.gowned_wait,
            Activity::ScreenMammo => &self.screen_mammo,
            Activity::DxMammo => &self.dx_mammo,
            Activity::DxUs => &self.dx_us,
            Activity::UsGuidedBiopsy => &self.us_guided_biopsy,
            Activity::MammoGuidedBiopsy => &self.mammo_guided_biopsy,
            Activity::AiAssess => &self.ai_assess,
            Activity::ScreenUs => &self.screen_us,
            Activity::MriGuidedBiopsy => &self.mri_guided_biopsy,
            Activity::RadiologistReview => &self.radiologist_review,
        }
    }

    pub fn get_mut(&mut self, activity: Activity) -> &mut ServiceDistribution {
        match activity {
            Activity::Checkin => &mut self.checkin,
            Activity::PublicWait => &mut self.public_wait,
            Activity::Consent => &mut self.consent,
            Activity::ChangeRoom => &mut self.change_room,
            Activity::GownedWait => &mut self.gowned_wait,
            Activity::ScreenMammo => &mut self.screen_mammo,
            Activity::DxMammo => &mut self.dx_mammo,
            Activity::DxUs => &mut self.dx_us,
            Activity::UsGuidedBiopsy => &mut self.us_guided_biopsy,
            Activity::MammoGuidedBiopsy => &mut self.mammo_guided_biopsy,
            Activity::AiAssess => &mut self.ai_assess,
            Activity::ScreenUs => &mut self.screen_us,
            Activity::MriGuidedBiopsy => &mut self.mri_guided_biopsy,
            Activity::RadiologistReview => &mut self.radiologist_review,
        }
    }

    /// First activity whose distribution is unusable, if any.
    pub fn first_invalid(&self) -> Option<(Activity, ServiceDistribution)> {
        ALL_ACTIVITIES
            .iter()
            .map(|a| (*a, *self.get(*a)))
            .find(|(_, d)| !d.is_valid())
    }

    pub fn sample<R: Rng + ?Sized>(&self, activity: Activity, rng: &mut R) -> f64 {
        self.get(activity).sample(rng)
    }
}

pub const ALL_ACTIVITIES: [Activity; 14] = [
    Activity::Checkin,
    Activity::PublicWait,
    Activity::Consent,
    Activity::ChangeRoom,
    Activity::GownedWait,
    Activity::ScreenMammo,
    Activity::DxMammo,
    Activity::DxUs,
    Activity::UsGuidedBiopsy,
    Activity::MammoGuidedBiopsy,
    Activity::AiAssess,
    Activity::ScreenUs,
    Activity::MriGuidedBiopsy,
    Activity::RadiologistReview,
];

/// Exponential gap (hours) for a Poisson process with `rate_per_hour`.
/// Returns `None` for a non-positive rate.
pub fn exponential_gap<R: Rng + ?Sized>(rate_per_hour: f64, rng: &mut R) -> Option<f64> {
    if !(rate_per_hour > 0.0) || !rate_per_hour.is_finite() {
        return None;
    }
    let exp = Exp::new(rate_per_hour).ok()?;
    Some(exp.sample(rng))
}
