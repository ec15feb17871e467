//! Waits, dwell times and time in system derived from a patient record.

use clinic_core::pathway::Station;
use clinic_core::routing::PatientType;
use clinic_core::telemetry::{PatientRecord, StationVisit};

#[derive(Debug, Clone, PartialEq)]
pub struct PatientDurations {
    pub patient_id: u64,
    pub patient_type: PatientType,
    pub time_in_system: f64,
    /// Release minus got for every visited station, in time order.
    pub dwells: Vec<(Station, f64)>,
    /// Time between becoming free to move on and taking the station. Stations
    /// taken while another is still held (radiologist reviews) carry no wait.
    pub waits: Vec<(Station, f64)>,
}

impl PatientDurations {
    pub fn wait_for(&self, station: Station) -> Option<f64> {
        lookup(&self.waits, station)
    }

    pub fn dwell_at(&self, station: Station) -> Option<f64> {
        lookup(&self.dwells, station)
    }

    pub fn total_wait(&self) -> f64 {
        self.waits.iter().map(|(_, w)| w).sum()
    }
}

fn lookup(entries: &[(Station, f64)], station: Station) -> Option<f64> {
    entries
        .iter()
        .find(|(s, _)| *s == station)
        .map(|(_, value)| *value)
}

/// True when `visit` starts while `other` is held.
fn taken_during(visit: &StationVisit, other: &StationVisit) -> bool {
    match (visit.got, other.got, other.release) {
        (Some(got), Some(other_got), Some(other_release)) => {
            other_got < got && other_release > got
        }
        _ => false,
    }
}

pub fn derive_durations(record: &PatientRecord) -> PatientDurations {
    let visited = record.visited_in_time_order();

    let dwells = visited
        .iter()
        .filter_map(|(station, visit)| visit.dwell().map(|d| (*station, d)))
        .collect();

    let mut waits = Vec::new();
    for (station, visit) in &visited {
        let Some(got) = visit.got else {
            continue;
        };
        if visited
            .iter()
            .any(|(other, other_visit)| other != station && taken_during(visit, other_visit))
        {
            continue;
        }
        let free_since = visited
            .iter()
            .filter_map(|(_, v)| v.release)
            .filter(|release| *release <= got)
            .fold(record.arrival_ts, f64::max);
        waits.push((*station, got - free_since));
    }

    PatientDurations {
        patient_id: record.patient_id,
        patient_type: record.patient_type,
        time_in_system: record.time_in_system(),
        dwells,
        waits,
    }
}
