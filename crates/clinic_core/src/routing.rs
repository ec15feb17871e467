//! Exam routing: maps a uniform draw at arrival to one of the pathway tags.
//!
//! The hour's exam mix is turned into an ordered cumulative table. When AI
//! triage is active the screening share is split so a fraction of screening
//! patients receive diagnostic follow-up during the same visit.

use std::fmt;

use bevy_ecs::prelude::Resource;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that the shares of one hour sum to one.
pub const SHARE_SUM_TOLERANCE: f64 = 1e-6;

/// Split of AI-referred screening patients across the same-visit follow-ups.
pub const SAME_VISIT_DX_MAMMO_US_SPLIT: f64 = 0.70;
pub const SAME_VISIT_DX_MAMMO_SPLIT: f64 = 0.15;
pub const SAME_VISIT_DX_US_SPLIT: f64 = 0.15;

/// Clock hour at which the clinic opens; simulation hour 0 starts here.
pub const DEFAULT_OPENING_HOUR: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MriProcedure {
    GuidedBiopsy,
    Other,
}

/// Log tags for the eleven pathways. The MRI pathway carries two tags, one
/// per procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientType {
    ScreenMammo,
    ScreenThenDxMammoUs,
    ScreenThenDxMammo,
    ScreenThenDxUs,
    DxMammoUs,
    DxMammo,
    DxUs,
    UsGuidedBiopsy,
    MammoGuidedBiopsy,
    ScreenUs,
    Mri(MriProcedure),
}

impl PatientType {
    pub const ALL: [PatientType; 12] = [
        PatientType::ScreenMammo,
        PatientType::ScreenThenDxMammoUs,
        PatientType::ScreenThenDxMammo,
        PatientType::ScreenThenDxUs,
        PatientType::DxMammoUs,
        PatientType::DxMammo,
        PatientType::DxUs,
        PatientType::UsGuidedBiopsy,
        PatientType::MammoGuidedBiopsy,
        PatientType::ScreenUs,
        PatientType::Mri(MriProcedure::GuidedBiopsy),
        PatientType::Mri(MriProcedure::Other),
    ];

    /// Tag written to the event log.
    pub fn tag(self) -> &'static str {
        match self {
            PatientType::ScreenMammo => "screen",
            PatientType::ScreenThenDxMammoUs => "screen + dx mammo us",
            PatientType::ScreenThenDxMammo => "screen + dx mammo",
            PatientType::ScreenThenDxUs => "screen + dx us",
            PatientType::DxMammoUs => "dx mammo us",
            PatientType::DxMammo => "dx mammo",
            PatientType::DxUs => "dx us",
            PatientType::UsGuidedBiopsy => "us bx",
            PatientType::MammoGuidedBiopsy => "mammo bx",
            PatientType::ScreenUs => "screen us",
            PatientType::Mri(MriProcedure::GuidedBiopsy) => "mri-guided bx",
            PatientType::Mri(MriProcedure::Other) => "mri",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Screening with same-visit diagnostic follow-up after AI triage.
    pub fn is_same_visit_follow_up(self) -> bool {
        matches!(
            self,
            PatientType::ScreenThenDxMammoUs
                | PatientType::ScreenThenDxMammo
                | PatientType::ScreenThenDxUs
        )
    }

    pub fn is_biopsy(self) -> bool {
        matches!(
            self,
            PatientType::UsGuidedBiopsy
                | PatientType::MammoGuidedBiopsy
                | PatientType::Mri(MriProcedure::GuidedBiopsy)
        )
    }

    pub fn is_mri(self) -> bool {
        matches!(self, PatientType::Mri(_))
    }
}

impl fmt::Display for PatientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Exam-type probabilities for one hour, in routing order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExamShares {
    pub screen_mammo: f64,
    pub dx_mammo_us: f64,
    pub dx_mammo: f64,
    pub dx_us: f64,
    pub us_guided_biopsy: f64,
    pub mammo_guided_biopsy: f64,
    pub screen_us: f64,
    pub mri_guided_biopsy: f64,
    /// Remaining MRI procedures; routed as MRI-only.
    #[serde(default)]
    pub other_mri: f64,
}

impl Default for ExamShares {
    fn default() -> Self {
        Self {
            screen_mammo: 0.55,
            dx_mammo_us: 0.12,
            dx_mammo: 0.08,
            dx_us: 0.12,
            us_guided_biopsy: 0.04,
            mammo_guided_biopsy: 0.03,
            screen_us: 0.04,
            mri_guided_biopsy: 0.01,
            other_mri: 0.01,
        }
    }
}

impl ExamShares {
    /// The eight routed shares in table order.
    pub fn ordered(&self) -> [f64; 8] {
        [
            self.screen_mammo,
            self.dx_mammo_us,
            self.dx_mammo,
            self.dx_us,
            self.us_guided_biopsy,
            self.mammo_guided_biopsy,
            self.screen_us,
            self.mri_guided_biopsy,
        ]
    }

    pub fn total(&self) -> f64 {
        self.ordered().iter().sum::<f64>() + self.other_mri
    }

    /// True when any share is negative, NaN or infinite.
    pub fn has_invalid_share(&self) -> bool {
        self.ordered()
            .iter()
            .chain([&self.other_mri])
            .any(|s| !s.is_finite() || *s < 0.0)
    }

    /// Baseline cumulative sums of the eight routed shares.
    pub fn cumulative(&self) -> [f64; 8] {
        let mut acc = 0.0;
        let mut out = [0.0; 8];
        for (slot, share) in out.iter_mut().zip(self.ordered()) {
            acc += share;
            *slot = acc;
        }
        out
    }
}

/// Hour index to exam shares. Hours past the end reuse the last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamMix(pub Vec<ExamShares>);

impl Default for ExamMix {
    fn default() -> Self {
        Self(vec![ExamShares::default(); 10])
    }
}

impl ExamMix {
    pub fn uniform(shares: ExamShares, hours: usize) -> Self {
        Self(vec![shares; hours.max(1)])
    }

    pub fn hours(&self) -> usize {
        self.0.len()
    }

    pub fn shares_at(&self, hour: usize) -> Option<&ExamShares> {
        self.0.get(hour).or_else(|| self.0.last())
    }
}

/// Named AI-triage schedules. Hours are clock hours of the clinic day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiWindow {
    #[default]
    None,
    Morning,
    Afternoon,
    Any,
}

impl AiWindow {
    /// Inclusive clock-hour range during which triage runs.
    pub fn clock_hours(self) -> Option<(u32, u32)> {
        match self {
            AiWindow::None => None,
            AiWindow::Morning => Some((9, 11)),
            AiWindow::Afternoon => Some((13, 15)),
            AiWindow::Any => Some((7, 16)),
        }
    }

    /// Normal(mean, sd) of the referral fraction drawn once per run.
    pub fn referral_distribution(self) -> Option<(f64, f64)> {
        match self {
            AiWindow::None => None,
            AiWindow::Morning => Some((0.36, 0.15)),
            AiWindow::Afternoon => Some((0.33, 0.12)),
            AiWindow::Any => Some((0.12, 0.05)),
        }
    }

    /// Samples the run's [AiPolicy]. The referral fraction is clamped to `[0, 1]`.
    pub fn sample_policy<R: Rng + ?Sized>(
        self,
        opening_hour: u32,
        hours: usize,
        rng: &mut R,
    ) -> AiPolicy {
        let (Some((first, last)), Some((mean, sd))) =
            (self.clock_hours(), self.referral_distribution())
        else {
            return AiPolicy::disabled();
        };
        let fraction = Normal::new(mean, sd)
            .map(|n| n.sample(rng))
            .unwrap_or(mean)
            .clamp(0.0, 1.0);
        let enabled_hours = (0..hours)
            .map(|h| {
                let clock = opening_hour + h as u32;
                clock >= first && clock <= last
            })
            .collect();
        AiPolicy {
            enabled_hours,
            referral_fraction: fraction,
        }
    }
}

/// Per-hour AI enable flags plus the run's referral fraction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiPolicy {
    /// Indexed by simulation hour; missing hours are disabled.
    pub enabled_hours: Vec<bool>,
    pub referral_fraction: f64,
}

impl AiPolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Triage on for every one of the first `hours` hours.
    pub fn always(hours: usize, referral_fraction: f64) -> Self {
        Self {
            enabled_hours: vec![true; hours],
            referral_fraction,
        }
    }

    pub fn is_active(&self, hour: usize) -> bool {
        self.enabled_hours.get(hour).copied().unwrap_or(false)
    }

    pub fn is_ever_active(&self) -> bool {
        self.enabled_hours.iter().any(|on| *on)
    }
}

/// One entry of a cumulative routing table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub upper: f64,
    pub patient_type: PatientType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTable {
    pub segments: Vec<Segment>,
    /// Screen-ultrasound cumulative; draws above it are MRI.
    pub mri_floor: f64,
    /// MRI-guided biopsy cumulative; MRI draws above it are other MRI.
    pub mri_biopsy_upper: f64,
}

impl RoutingTable {
    pub fn build(shares: &ExamShares, ai_fraction: Option<f64>) -> Self {
        let cum = shares.cumulative();
        let mut segments = Vec::with_capacity(11);

        match ai_fraction {
            Some(f) => {
                let s = shares.screen_mammo;
                let no_follow_up = s * (1.0 - f);
                let dx_mammo_us = no_follow_up + s * f * SAME_VISIT_DX_MAMMO_US_SPLIT;
                let dx_mammo = dx_mammo_us + s * f * SAME_VISIT_DX_MAMMO_SPLIT;
                segments.push(Segment {
                    upper: no_follow_up,
                    patient_type: PatientType::ScreenMammo,
                });
                segments.push(Segment {
                    upper: dx_mammo_us,
                    patient_type: PatientType::ScreenThenDxMammoUs,
                });
                segments.push(Segment {
                    upper: dx_mammo,
                    patient_type: PatientType::ScreenThenDxMammo,
                });
                // Closes exactly on the baseline screening cumulative.
                segments.push(Segment {
                    upper: cum[0],
                    patient_type: PatientType::ScreenThenDxUs,
                });
            }
            None => segments.push(Segment {
                upper: cum[0],
                patient_type: PatientType::ScreenMammo,
            }),
        }

        let rest = [
            PatientType::DxMammoUs,
            PatientType::DxMammo,
            PatientType::DxUs,
            PatientType::UsGuidedBiopsy,
            PatientType::MammoGuidedBiopsy,
            PatientType::ScreenUs,
            PatientType::Mri(MriProcedure::GuidedBiopsy),
        ];
        for (upper, patient_type) in cum[1..].iter().zip(rest) {
            segments.push(Segment {
                upper: *upper,
                patient_type,
            });
        }

        Self {
            segments,
            mri_floor: cum[6],
            mri_biopsy_upper: cum[7],
        }
    }

    /// Segment widths in table order.
    pub fn widths(&self) -> Vec<f64> {
        let mut lower = 0.0;
        self.segments
            .iter()
            .map(|s| {
                let w = s.upper - lower;
                lower = s.upper;
                w
            })
            .collect()
    }

    pub fn select(&self, draw: f64) -> PatientType {
        if draw > self.mri_floor {
            return if draw <= self.mri_biopsy_upper {
                PatientType::Mri(MriProcedure::GuidedBiopsy)
            } else {
                PatientType::Mri(MriProcedure::Other)
            };
        }
        let mut lower = 0.0;
        for segment in &self.segments {
            if draw <= segment.upper && segment.upper > lower {
                return segment.patient_type;
            }
            lower = segment.upper;
        }
        PatientType::ScreenUs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub patient_type: PatientType,
    pub draw: f64,
    pub ai_active: bool,
    pub table: RoutingTable,
}

/// Hour index for an arrival time; negative times map to hour 0.
pub fn hour_index(t: f64) -> usize {
    if t <= 0.0 {
        0
    } else {
        t.floor() as usize
    }
}

/// Routing inputs for a run: the exam mix and the sampled AI policy.
#[derive(Debug, Clone, Default, Resource)]
pub struct ExamRouter {
    pub exam_mix: ExamMix,
    pub ai: AiPolicy,
}

impl ExamRouter {
    pub fn new(exam_mix: ExamMix, ai: AiPolicy) -> Self {
        Self { exam_mix, ai }
    }

    pub fn table_at(&self, arrival_ts: f64) -> (RoutingTable, bool) {
        let hour = hour_index(arrival_ts);
        let shares = self.exam_mix.shares_at(hour).copied().unwrap_or_default();
        let ai_active = self.ai.is_active(hour);
        let table = RoutingTable::build(&shares, ai_active.then_some(self.ai.referral_fraction));
        (table, ai_active)
    }

    pub fn route(&self, arrival_ts: f64, draw: f64) -> RouteDecision {
        let (table, ai_active) = self.table_at(arrival_ts);
        RouteDecision {
            patient_type: table.select(draw),
            draw,
            ai_active,
            table,
        }
    }
}
