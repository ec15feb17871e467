//! Patient log: one timestamped record per patient, appended at exit.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::pathway::Station;
use crate::routing::PatientType;

/// Got/release pair for one station. `None` means the station was not visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StationVisit {
    pub got: Option<f64>,
    pub release: Option<f64>,
}

impl StationVisit {
    pub fn is_visited(&self) -> bool {
        self.got.is_some()
    }

    /// Time spent holding the station.
    pub fn dwell(&self) -> Option<f64> {
        Some(self.release? - self.got?)
    }
}

/// Per-station visits indexed by [Station::index].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationVisits(Vec<StationVisit>);

impl Default for StationVisits {
    fn default() -> Self {
        Self(vec![StationVisit::default(); Station::COUNT])
    }
}

impl StationVisits {
    pub fn get(&self, station: Station) -> &StationVisit {
        &self.0[station.index()]
    }

    pub fn mark_got(&mut self, station: Station, t: f64) {
        self.0[station.index()].got = Some(t);
    }

    pub fn mark_released(&mut self, station: Station, t: f64) {
        self.0[station.index()].release = Some(t);
    }

    /// Visited stations with their visits, in column order.
    pub fn visited(&self) -> impl Iterator<Item = (Station, &StationVisit)> {
        Station::ALL
            .iter()
            .zip(self.0.iter())
            .filter(|(_, v)| v.is_visited())
            .map(|(s, v)| (*s, v))
    }
}

/// One patient's completed visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: u64,
    pub patient_type: PatientType,
    pub arrival_ts: f64,
    pub exit_ts: f64,
    pub visits: StationVisits,
}

impl PatientRecord {
    pub fn visit(&self, station: Station) -> &StationVisit {
        self.visits.get(station)
    }

    /// Arrival to exit.
    pub fn time_in_system(&self) -> f64 {
        self.exit_ts - self.arrival_ts
    }

    /// Stations with a got timestamp, ordered by when they were taken.
    pub fn visited_in_time_order(&self) -> Vec<(Station, StationVisit)> {
        let mut visited: Vec<_> = self.visits.visited().map(|(s, v)| (s, *v)).collect();
        visited.sort_by(|a, b| {
            let ta = a.1.got.unwrap_or(f64::INFINITY);
            let tb = b.1.got.unwrap_or(f64::INFINITY);
            ta.total_cmp(&tb)
        });
        visited
    }
}

/// Records in exit order. Insert as a resource before running.
#[derive(Debug, Default, Resource)]
pub struct PatientLog {
    pub records: Vec<PatientRecord>,
}

impl PatientLog {
    pub fn push(&mut self, record: PatientRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Takes every record, leaving the log empty.
    pub fn drain(&mut self) -> Vec<PatientRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn count_of(&self, patient_type: PatientType) -> usize {
        self.records
            .iter()
            .filter(|r| r.patient_type == patient_type)
            .count()
    }

    pub fn mean_time_in_system(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let total: f64 = self.records.iter().map(PatientRecord::time_in_system).sum();
        Some(total / self.records.len() as f64)
    }
}
