//! Trial orchestration for the diagnostic imaging clinic simulation.
//!
//! Loads the clinic's hourly arrival and exam-mix tables, runs one simulation
//! per seed in parallel, derives waits and dwell times from each patient log
//! and writes the logs to CSV.
//!
//! - [`inputs`]: CSV loaders for arrival rates and the exam mix
//! - [`trials`]: seed selection and parallel runs using rayon
//! - [`durations`]: per-patient waits, dwell times and time in system
//! - [`export`]: patient log CSV output

pub mod durations;
pub mod error;
pub mod export;
pub mod inputs;
pub mod trials;

pub use durations::{derive_durations, PatientDurations};
pub use error::ExperimentError;
pub use export::write_patient_log_csv;
pub use inputs::{load_exam_mix, load_hourly_arrivals};
pub use trials::{pick_seeds, run_trials, TrialResult};
