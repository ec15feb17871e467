//! Patient arrival generator.
//!
//! Arrivals follow a piecewise-constant hourly rate. The generator reacts to
//! `SimulationStarted` and `PatientArrival` events and schedules its own next
//! arrival until the stop time or patient cap is reached.

use bevy_ecs::prelude::Resource;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::distributions::exponential_gap;
use crate::routing::hour_index;

/// Expected patients per hour, indexed by simulation hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrivalSchedule(pub Vec<f64>);

impl Default for ArrivalSchedule {
    fn default() -> Self {
        Self(vec![
            8.0, 14.0, 16.0, 15.0, 12.0, 10.0, 14.0, 14.0, 11.0, 5.0,
        ])
        .with_closing_surge()
    }
}

impl ArrivalSchedule {
    pub fn constant(rate: f64, hours: usize) -> Self {
        Self(vec![rate; hours.max(1)])
    }

    /// Doubles the final hour's rate to model the end-of-day rush.
    pub fn with_closing_surge(mut self) -> Self {
        if let Some(last) = self.0.last_mut() {
            *last *= 2.0;
        }
        self
    }

    pub fn hours(&self) -> usize {
        self.0.len()
    }

    /// Rate for `hour`; hours past the end reuse the last rate.
    pub fn rate_at(&self, hour: usize) -> f64 {
        self.0
            .get(hour)
            .or_else(|| self.0.last())
            .copied()
            .unwrap_or(0.0)
    }

    /// Expected arrivals up to the end of `hour`.
    pub fn cumulative_at(&self, hour: usize) -> f64 {
        let end = (hour + 1).min(self.0.len());
        self.0[..end].iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalMode {
    /// Exponential gaps at the current hour's rate.
    #[default]
    Poisson,
    /// Poisson gaps, but each hour stops once the cumulative expected count is
    /// reached and resumes at the next hour boundary. Falling behind an hour's
    /// quota spawns the deficit immediately.
    HourlyQuota,
}

#[derive(Debug, Clone, Resource)]
pub struct ArrivalGenerator {
    schedule: ArrivalSchedule,
    mode: ArrivalMode,
    stop_time: f64,
    max_patients: Option<u64>,
    spawned: u64,
    quota_hour: usize,
}

impl ArrivalGenerator {
    pub fn new(
        schedule: ArrivalSchedule,
        mode: ArrivalMode,
        stop_time: f64,
        max_patients: Option<u64>,
    ) -> Self {
        Self {
            schedule,
            mode,
            stop_time,
            max_patients,
            spawned: 0,
            quota_hour: 0,
        }
    }

    pub fn spawned_count(&self) -> u64 {
        self.spawned
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_time
    }

    fn below_cap(&self) -> bool {
        self.max_patients.map_or(true, |max| self.spawned < max)
    }

    /// Whether an arrival firing at `now` may spawn a patient.
    pub fn admits(&self, now: f64) -> bool {
        now <= self.stop_time && self.below_cap()
    }

    /// Counts a spawned patient and returns its id (ids start at 1).
    pub fn record_spawn(&mut self) -> u64 {
        self.spawned += 1;
        self.spawned
    }

    fn gap<R: Rng + ?Sized>(&self, hour: usize, rng: &mut R) -> Option<f64> {
        exponential_gap(self.schedule.rate_at(hour), rng)
    }

    /// Time of the first arrival for a run starting at `now`.
    pub fn first_arrival<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Option<f64> {
        if now >= self.stop_time || !self.below_cap() {
            return None;
        }
        self.quota_hour = hour_index(now);
        self.gap(self.quota_hour, rng).map(|g| now + g)
    }

    /// Time of the arrival after one that fired at `now`, or `None` when the
    /// generator is exhausted.
    pub fn next_arrival<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Option<f64> {
        if now >= self.stop_time || !self.below_cap() {
            return None;
        }
        match self.mode {
            ArrivalMode::Poisson => self.gap(hour_index(now), rng).map(|g| now + g),
            ArrivalMode::HourlyQuota => self.next_quota_arrival(now, rng),
        }
    }

    fn next_quota_arrival<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Option<f64> {
        let current = hour_index(now);
        let quota_met = self.spawned as f64 >= self.schedule.cumulative_at(self.quota_hour);

        if quota_met && current == self.quota_hour {
            self.quota_hour += 1;
            let boundary = self.quota_hour as f64;
            if boundary >= self.stop_time {
                return None;
            }
            return self.gap(self.quota_hour, rng).map(|g| boundary + g);
        }
        if quota_met {
            self.quota_hour = current;
            return self.gap(current, rng).map(|g| now + g);
        }
        if current > self.quota_hour {
            // Behind the previous hour's quota: catch up without waiting.
            return Some(now);
        }
        self.gap(self.quota_hour, rng).map(|g| now + g)
    }
}
