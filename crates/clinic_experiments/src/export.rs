//! Patient log export.
//!
//! One row per patient in exit order: raw got/release timestamps for every
//! station, then derived waits, dwell times and time in system. Stations a
//! patient never visited are written as empty fields.

use std::path::Path;

use clinic_core::telemetry::PatientRecord;

use crate::error::ExperimentError;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/writer_utils.rs"]
mod writer_utils;

/// Write `records` to a CSV file at `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if `records` is empty or the file cannot be written.
pub fn write_patient_log_csv(
    records: &[PatientRecord],
    path: impl AsRef<Path>,
) -> Result<(), ExperimentError> {
    writer_utils::ensure_not_empty(records)?;
    let file = writer_utils::create_output_file(path.as_ref())?;
    csv::write_patient_log_impl(records, file)?;
    tracing::debug!(path = %path.as_ref().display(), rows = records.len(), "patient log written");
    Ok(())
}

/// Header row written by [write_patient_log_csv].
pub fn patient_log_header() -> Vec<String> {
    csv::header()
}
