use bevy_ecs::prelude::Component;

use crate::pathway::{Claim, Step};
use crate::pools::{PoolId, Ticket};
use crate::routing::PatientType;
use crate::telemetry::{PatientRecord, StationVisits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatientState {
    /// Spawned, not yet routed.
    #[default]
    Arrived,
    /// Running steps.
    Active,
    /// Suspended until every pending ticket is granted.
    Waiting,
    /// Suspended for a timed service step.
    InService,
    Done,
}

/// A unit the patient holds (or is waiting on) together with its resolved pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldUnit {
    pub claim: Claim,
    pub pool: PoolId,
    pub ticket: Ticket,
}

/// Resumable patient task: a compiled program plus the cursor into it.
#[derive(Debug, Clone, Default, Component)]
pub struct PatientTask {
    pub patient_id: u64,
    pub arrival_ts: f64,
    pub state: PatientState,
    /// Set on first resume by the router, or up front for scripted patients.
    pub patient_type: Option<PatientType>,
    pub program: Vec<Step>,
    pub cursor: usize,
    pub held: Vec<HeldUnit>,
    /// Tickets requested but not yet granted.
    pub pending: Vec<Ticket>,
    pub visits: StationVisits,
}

impl PatientTask {
    pub fn new(patient_id: u64, arrival_ts: f64) -> Self {
        Self {
            patient_id,
            arrival_ts,
            ..Default::default()
        }
    }

    /// A patient with a fixed program that skips routing.
    pub fn scripted(
        patient_id: u64,
        arrival_ts: f64,
        patient_type: PatientType,
        program: Vec<Step>,
    ) -> Self {
        Self {
            patient_type: Some(patient_type),
            program,
            ..Self::new(patient_id, arrival_ts)
        }
    }

    pub fn is_routed(&self) -> bool {
        self.patient_type.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.program.len()
    }

    /// Marks `ticket` granted; returns `true` once nothing is pending.
    pub fn grant(&mut self, ticket: Ticket) -> bool {
        self.pending.retain(|t| *t != ticket);
        self.pending.is_empty()
    }

    /// Removes and returns the oldest held unit for `claim`.
    pub fn take_held(&mut self, claim: Claim) -> Option<HeldUnit> {
        let index = self.held.iter().position(|h| h.claim == claim)?;
        Some(self.held.remove(index))
    }

    pub fn into_record(self, exit_ts: f64) -> Option<PatientRecord> {
        Some(PatientRecord {
            patient_id: self.patient_id,
            patient_type: self.patient_type?,
            arrival_ts: self.arrival_ts,
            exit_ts,
            visits: self.visits,
        })
    }
}
