//! Event throughput for a run: how many events of each kind were dispatched
//! and how much simulated time they covered.

use std::collections::HashMap;
use std::time::Instant;

use bevy_ecs::prelude::Resource;

use crate::clock::EventKind;

#[derive(Debug, Default, Resource)]
pub struct EventMetrics {
    pub events_processed: u64,
    /// Wall-clock instant of the first dispatched event.
    pub started_at: Option<Instant>,
    /// Timestamp of the latest dispatched event, in simulated hours.
    pub last_event_ts: f64,
    pub events_by_kind: HashMap<EventKind, u64>,
}

impl EventMetrics {
    pub fn record_event(&mut self, kind: EventKind, timestamp: f64) {
        self.started_at.get_or_insert_with(Instant::now);
        self.events_processed += 1;
        self.last_event_ts = self.last_event_ts.max(timestamp);
        *self.events_by_kind.entry(kind).or_default() += 1;
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.events_by_kind.get(&kind).copied().unwrap_or(0)
    }

    fn elapsed_secs(&self) -> f64 {
        self.started_at
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Dispatched events per wall-clock second; 0 before the first event.
    pub fn events_per_second(&self) -> f64 {
        let elapsed = self.elapsed_secs();
        if elapsed > 0.0 {
            self.events_processed as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            events = self.events_processed,
            arrivals = self.count(EventKind::PatientArrival),
            resumes = self.count(EventKind::Resume),
            simulated_hours = self.last_event_ts,
            events_per_second = self.events_per_second() as u64,
            "event throughput"
        );
    }
}
