//! Pathway programs: the ordered acquire/serve/release steps of each exam.
//!
//! Every pathway is compiled once per patient into a flat [Step] list that the
//! patient-flow system interprets. The workflow policy decides whether AI
//! assessment runs and which radiologist pool each review uses.

use serde::{Deserialize, Serialize};

use crate::distributions::Activity;
use crate::pools::PoolId;
use crate::routing::{MriProcedure, PatientType};
use crate::scenario::{WorkflowMode, WorkflowPolicy};

/// Timestamped stations of the patient log, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Station {
    CheckinStaff,
    PublicWaitRoom,
    ConsentStaff,
    ChangeRoom,
    GownedWaitRoom,
    ScreenScanner,
    AiAssess,
    DxScannerBeforeUsAfterAi,
    RadDxMammoUsMammoAfterAi,
    UsMachineAfterDxScannerAfterAi,
    RadDxMammoUsUsAfterAi,
    DxScannerAfterAi,
    RadDxMammoAfterAi,
    UsMachineAfterAi,
    RadDxUsAfterAi,
    DxScannerBeforeUs,
    RadDxMammoUsMammo,
    UsMachineAfterDxScanner,
    RadDxMammoUsUs,
    DxScanner,
    RadDxMammo,
    UsMachine,
    RadDxUs,
    UsMachineBx,
    ScannerAfterUsBx,
    RadUsBx,
    ScannerBx,
    RadMammoBx,
    ScreenUsMachine,
    MriBx,
    ScannerAfterMriBx,
    RadMriBx,
    CheckoutChangeRoom,
}

impl Station {
    pub const COUNT: usize = 33;

    pub const ALL: [Station; Station::COUNT] = [
        Station::CheckinStaff,
        Station::PublicWaitRoom,
        Station::ConsentStaff,
        Station::ChangeRoom,
        Station::GownedWaitRoom,
        Station::ScreenScanner,
        Station::AiAssess,
        Station::DxScannerBeforeUsAfterAi,
        Station::RadDxMammoUsMammoAfterAi,
        Station::UsMachineAfterDxScannerAfterAi,
        Station::RadDxMammoUsUsAfterAi,
        Station::DxScannerAfterAi,
        Station::RadDxMammoAfterAi,
        Station::UsMachineAfterAi,
        Station::RadDxUsAfterAi,
        Station::DxScannerBeforeUs,
        Station::RadDxMammoUsMammo,
        Station::UsMachineAfterDxScanner,
        Station::RadDxMammoUsUs,
        Station::DxScanner,
        Station::RadDxMammo,
        Station::UsMachine,
        Station::RadDxUs,
        Station::UsMachineBx,
        Station::ScannerAfterUsBx,
        Station::RadUsBx,
        Station::ScannerBx,
        Station::RadMammoBx,
        Station::ScreenUsMachine,
        Station::MriBx,
        Station::ScannerAfterMriBx,
        Station::RadMriBx,
        Station::CheckoutChangeRoom,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column stem used for `got_<name>_ts` / `release_<name>_ts`.
    pub fn name(self) -> &'static str {
        match self {
            Station::CheckinStaff => "checkin_staff",
            Station::PublicWaitRoom => "public_wait_room",
            Station::ConsentStaff => "consent_staff",
            Station::ChangeRoom => "change_room",
            Station::GownedWaitRoom => "gowned_wait_room",
            Station::ScreenScanner => "screen_scanner",
            Station::AiAssess => "ai_assess",
            Station::DxScannerBeforeUsAfterAi => "dx_scanner_before_us_after_ai",
            Station::RadDxMammoUsMammoAfterAi => "rad_dx_mammo_us_mammo_after_ai",
            Station::UsMachineAfterDxScannerAfterAi => "us_machine_after_dx_scanner_after_ai",
            Station::RadDxMammoUsUsAfterAi => "rad_dx_mammo_us_us_after_ai",
            Station::DxScannerAfterAi => "dx_scanner_after_ai",
            Station::RadDxMammoAfterAi => "rad_dx_mammo_after_ai",
            Station::UsMachineAfterAi => "us_machine_after_ai",
            Station::RadDxUsAfterAi => "rad_dx_us_after_ai",
            Station::DxScannerBeforeUs => "dx_scanner_before_us",
            Station::RadDxMammoUsMammo => "rad_dx_mammo_us_mammo",
            Station::UsMachineAfterDxScanner => "us_machine_after_dx_scanner",
            Station::RadDxMammoUsUs => "rad_dx_mammo_us_us",
            Station::DxScanner => "dx_scanner",
            Station::RadDxMammo => "rad_dx_mammo",
            Station::UsMachine => "us_machine",
            Station::RadDxUs => "rad_dx_us",
            Station::UsMachineBx => "us_machine_bx",
            Station::ScannerAfterUsBx => "scanner_after_us_bx",
            Station::RadUsBx => "rad_us_bx",
            Station::ScannerBx => "scanner_bx",
            Station::RadMammoBx => "rad_mammo_bx",
            Station::ScreenUsMachine => "screen_us_machine",
            Station::MriBx => "mri_bx",
            Station::ScannerAfterMriBx => "scanner_after_mri_bx",
            Station::RadMriBx => "rad_mri_bx",
            Station::CheckoutChangeRoom => "checkout_change_room",
        }
    }
}

/// How a radiologist claim picks its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewRoute {
    /// Always the general radiologist pool.
    General,
    /// AI assessment and same-visit follow-up reviews.
    SameVisit,
    /// Ordinary diagnostic reviews; may borrow an idle dedicated radiologist.
    DxReview,
}

/// One unit to hold: a fixed pool, or a radiologist resolved at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Claim {
    Pool(PoolId),
    Radiologist(ReviewRoute),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Request every claim back-to-back; continue once all are held.
    Acquire(Vec<Claim>),
    /// Stamp `got_<station>` with the current time.
    Got(Station),
    /// Hold everything currently held for one sampled duration.
    Serve(Activity),
    /// Stamp `release_<station>` with the current time.
    Released(Station),
    /// Return the oldest held unit matching the claim.
    Release(Claim),
}

/// Incremental builder for a step list.
#[derive(Debug, Default)]
struct Program {
    steps: Vec<Step>,
}

impl Program {
    fn acquire(&mut self, claims: &[Claim]) -> &mut Self {
        self.steps.push(Step::Acquire(claims.to_vec()));
        self
    }

    fn got(&mut self, station: Station) -> &mut Self {
        self.steps.push(Step::Got(station));
        self
    }

    fn serve(&mut self, activity: Activity) -> &mut Self {
        self.steps.push(Step::Serve(activity));
        self
    }

    fn released(&mut self, station: Station) -> &mut Self {
        self.steps.push(Step::Released(station));
        self
    }

    fn release(&mut self, claim: Claim) -> &mut Self {
        self.steps.push(Step::Release(claim));
        self
    }

    /// Take one unit of `pool`, serve, give it back.
    fn visit(&mut self, pool: PoolId, station: Station, activity: Activity) -> &mut Self {
        let claim = Claim::Pool(pool);
        self.acquire(&[claim])
            .got(station)
            .serve(activity)
            .released(station)
            .release(claim)
    }

    /// Imaging on `modality`, then a radiologist review while the modality is
    /// still held. Both are released afterwards, modality first.
    fn imaging_with_review(
        &mut self,
        modality: PoolId,
        station: Station,
        activity: Activity,
        route: ReviewRoute,
        review_station: Station,
    ) -> &mut Self {
        let machine = Claim::Pool(modality);
        let reader = Claim::Radiologist(route);
        self.acquire(&[machine])
            .got(station)
            .serve(activity)
            .acquire(&[reader])
            .got(review_station)
            .serve(Activity::RadiologistReview)
            .released(station)
            .released(review_station)
            .release(machine)
            .release(reader)
    }

    fn finish(self) -> Vec<Step> {
        self.steps
    }
}

/// Compiles the step list for `patient_type` under `policy`.
pub fn build_program(patient_type: PatientType, policy: &WorkflowPolicy) -> Vec<Step> {
    let mut p = Program::default();

    if let PatientType::Mri(procedure) = patient_type {
        if procedure == MriProcedure::GuidedBiopsy {
            mri_guided_biopsy(&mut p);
        }
        return p.finish();
    }

    prelude(&mut p, patient_type);

    let dx_review = if policy.share_dedicated_with_dx_review {
        ReviewRoute::DxReview
    } else {
        ReviewRoute::General
    };

    match patient_type {
        PatientType::ScreenMammo => screening(&mut p, policy),
        PatientType::ScreenThenDxMammoUs => {
            screening(&mut p, policy);
            p.imaging_with_review(
                PoolId::Scanner,
                Station::DxScannerBeforeUsAfterAi,
                Activity::DxMammo,
                ReviewRoute::SameVisit,
                Station::RadDxMammoUsMammoAfterAi,
            )
            .imaging_with_review(
                PoolId::UsMachine,
                Station::UsMachineAfterDxScannerAfterAi,
                Activity::DxUs,
                ReviewRoute::SameVisit,
                Station::RadDxMammoUsUsAfterAi,
            );
        }
        PatientType::ScreenThenDxMammo => {
            screening(&mut p, policy);
            p.imaging_with_review(
                PoolId::Scanner,
                Station::DxScannerAfterAi,
                Activity::DxMammo,
                ReviewRoute::SameVisit,
                Station::RadDxMammoAfterAi,
            );
        }
        PatientType::ScreenThenDxUs => {
            screening(&mut p, policy);
            p.imaging_with_review(
                PoolId::UsMachine,
                Station::UsMachineAfterAi,
                Activity::DxUs,
                ReviewRoute::SameVisit,
                Station::RadDxUsAfterAi,
            );
        }
        PatientType::DxMammoUs => {
            p.imaging_with_review(
                PoolId::Scanner,
                Station::DxScannerBeforeUs,
                Activity::DxMammo,
                dx_review,
                Station::RadDxMammoUsMammo,
            )
            .imaging_with_review(
                PoolId::UsMachine,
                Station::UsMachineAfterDxScanner,
                Activity::DxUs,
                dx_review,
                Station::RadDxMammoUsUs,
            );
        }
        PatientType::DxMammo => {
            p.imaging_with_review(
                PoolId::Scanner,
                Station::DxScanner,
                Activity::DxMammo,
                dx_review,
                Station::RadDxMammo,
            );
        }
        PatientType::DxUs => {
            p.imaging_with_review(
                PoolId::UsMachine,
                Station::UsMachine,
                Activity::DxUs,
                dx_review,
                Station::RadDxUs,
            );
        }
        PatientType::UsGuidedBiopsy => us_guided_biopsy(&mut p),
        PatientType::MammoGuidedBiopsy => mammo_guided_biopsy(&mut p),
        PatientType::ScreenUs => {
            p.visit(PoolId::UsMachine, Station::ScreenUsMachine, Activity::ScreenUs);
        }
        PatientType::Mri(_) => {}
    }

    p.visit(
        PoolId::ChangeRoom,
        Station::CheckoutChangeRoom,
        Activity::ChangeRoom,
    );
    p.finish()
}

fn prelude(p: &mut Program, patient_type: PatientType) {
    p.visit(PoolId::CheckinStaff, Station::CheckinStaff, Activity::Checkin)
        .visit(
            PoolId::PublicWaitRoom,
            Station::PublicWaitRoom,
            Activity::PublicWait,
        );
    if patient_type.is_biopsy() {
        p.visit(PoolId::ConsentStaff, Station::ConsentStaff, Activity::Consent);
    }
    p.visit(PoolId::ChangeRoom, Station::ChangeRoom, Activity::ChangeRoom)
        .visit(
            PoolId::GownedWaitRoom,
            Station::GownedWaitRoom,
            Activity::GownedWait,
        );
}

/// Screening mammogram, followed by AI assessment in the same-visit workflow.
fn screening(p: &mut Program, policy: &WorkflowPolicy) {
    p.visit(PoolId::Scanner, Station::ScreenScanner, Activity::ScreenMammo);
    if policy.mode == WorkflowMode::SameVisit {
        let reader = Claim::Radiologist(ReviewRoute::SameVisit);
        p.acquire(&[reader])
            .got(Station::AiAssess)
            .serve(Activity::AiAssess)
            .released(Station::AiAssess)
            .release(reader);
    }
}

fn us_guided_biopsy(p: &mut Program) {
    let machine = Claim::Pool(PoolId::UsMachine);
    let reader = Claim::Radiologist(ReviewRoute::General);
    p.acquire(&[machine, reader])
        .got(Station::UsMachineBx)
        .serve(Activity::UsGuidedBiopsy)
        .released(Station::UsMachineBx)
        .release(machine)
        .release(reader)
        .imaging_with_review(
            PoolId::Scanner,
            Station::ScannerAfterUsBx,
            Activity::DxMammo,
            ReviewRoute::General,
            Station::RadUsBx,
        );
}

/// Biopsy, post-biopsy mammogram and review all happen on one scanner and
/// radiologist hold.
fn mammo_guided_biopsy(p: &mut Program) {
    let machine = Claim::Pool(PoolId::Scanner);
    let reader = Claim::Radiologist(ReviewRoute::General);
    p.acquire(&[machine, reader])
        .got(Station::ScannerBx)
        .serve(Activity::MammoGuidedBiopsy)
        .serve(Activity::DxMammo)
        .got(Station::RadMammoBx)
        .serve(Activity::RadiologistReview)
        .released(Station::ScannerBx)
        .released(Station::RadMammoBx)
        .release(machine)
        .release(reader);
}

fn mri_guided_biopsy(p: &mut Program) {
    let reader = Claim::Radiologist(ReviewRoute::General);
    p.acquire(&[reader])
        .got(Station::MriBx)
        .serve(Activity::MriGuidedBiopsy)
        .released(Station::MriBx)
        .release(reader)
        .imaging_with_review(
            PoolId::Scanner,
            Station::ScannerAfterMriBx,
            Activity::DxMammo,
            ReviewRoute::General,
            Station::RadMriBx,
        );
}

/// Pool a claim draws from. `dedicated_in_use` is the dedicated radiologist
/// pool's occupancy at the moment of the request; it is read, not reserved.
pub fn resolve_claim(claim: Claim, policy: &WorkflowPolicy, dedicated_in_use: u32) -> PoolId {
    match claim {
        Claim::Pool(pool) => pool,
        Claim::Radiologist(ReviewRoute::General) => PoolId::Radiologist,
        Claim::Radiologist(ReviewRoute::SameVisit) => {
            if policy.dedicated_same_visit_radiologist {
                PoolId::SameVisitRadiologist
            } else {
                PoolId::Radiologist
            }
        }
        Claim::Radiologist(ReviewRoute::DxReview) => {
            if policy.dedicated_same_visit_radiologist
                && policy.share_dedicated_with_dx_review
                && dedicated_in_use == 0
            {
                PoolId::SameVisitRadiologist
            } else {
                PoolId::Radiologist
            }
        }
    }
}

/// Stations a completed patient of this type carries timestamps for.
pub fn expected_stations(patient_type: PatientType, policy: &WorkflowPolicy) -> Vec<Station> {
    let mut stations = Vec::new();
    for step in build_program(patient_type, policy) {
        if let Step::Got(station) = step {
            if !stations.contains(&station) {
                stations.push(station);
            }
        }
    }
    stations
}
