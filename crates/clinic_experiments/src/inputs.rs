//! CSV loaders for the clinic's input tables.

use std::fs::File;
use std::path::Path;

use clinic_core::routing::{ExamMix, ExamShares};
use clinic_core::spawner::ArrivalSchedule;

use crate::error::ExperimentError;

/// Column holding the mean arrivals for each hour.
const RATE_COLUMN: &str = "avg";
/// Accepted names for the exam-type column of the exam-mix table.
const EXAM_TYPE_COLUMNS: [&str; 2] = ["exam_type_new", "exam_type"];
const HOUR_COLUMN_PREFIX: &str = "h_";

fn open(path: &Path) -> Result<csv::Reader<File>, ExperimentError> {
    let file = File::open(path).map_err(|source| ExperimentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

fn parse_f64(path: &Path, row: usize, column: &str, value: &str) -> Result<f64, ExperimentError> {
    value.parse().map_err(|_| ExperimentError::InvalidValue {
        path: path.to_path_buf(),
        row,
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Reads one rate per hour from the `avg` column. The last hour is doubled to
/// model the closing surge.
pub fn load_hourly_arrivals(path: impl AsRef<Path>) -> Result<ArrivalSchedule, ExperimentError> {
    let path = path.as_ref();
    let mut reader = open(path)?;
    let column = reader
        .headers()?
        .iter()
        .position(|h| h == RATE_COLUMN)
        .ok_or_else(|| ExperimentError::MissingColumn {
            path: path.to_path_buf(),
            column: RATE_COLUMN.to_string(),
        })?;

    let mut rates = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let value = record.get(column).unwrap_or_default();
        rates.push(parse_f64(path, row + 1, RATE_COLUMN, value)?);
    }
    if rates.is_empty() {
        return Err(ExperimentError::EmptyTable {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!(path = %path.display(), hours = rates.len(), "loaded hourly arrivals");
    Ok(ArrivalSchedule(rates).with_closing_surge())
}

/// Share slot for an exam-type label, or `None` for an unknown label.
fn share_slot<'a>(shares: &'a mut ExamShares, name: &str) -> Option<&'a mut f64> {
    let slot = match name.to_ascii_lowercase().as_str() {
        "screen mammo" => &mut shares.screen_mammo,
        "dx mammo + dx us" => &mut shares.dx_mammo_us,
        "dx mammo" => &mut shares.dx_mammo,
        "dx us" => &mut shares.dx_us,
        "bx us" => &mut shares.us_guided_biopsy,
        "bx mammo" => &mut shares.mammo_guided_biopsy,
        "screen us" => &mut shares.screen_us,
        "bx mri" => &mut shares.mri_guided_biopsy,
        "mri" => &mut shares.other_mri,
        _ => return None,
    };
    Some(slot)
}

fn zero_shares() -> ExamShares {
    ExamShares {
        screen_mammo: 0.0,
        dx_mammo_us: 0.0,
        dx_mammo: 0.0,
        dx_us: 0.0,
        us_guided_biopsy: 0.0,
        mammo_guided_biopsy: 0.0,
        screen_us: 0.0,
        mri_guided_biopsy: 0.0,
        other_mri: 0.0,
    }
}

/// Reads the exam mix: one row per exam type and one `h_<clock hour>` column
/// per hour. Hour columns are ordered by clock hour; the earliest becomes hour
/// index 0. Exam types missing from the table get a share of 0.
pub fn load_exam_mix(path: impl AsRef<Path>) -> Result<ExamMix, ExperimentError> {
    let path = path.as_ref();
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();

    let type_column = EXAM_TYPE_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
        .ok_or_else(|| ExperimentError::MissingColumn {
            path: path.to_path_buf(),
            column: EXAM_TYPE_COLUMNS[0].to_string(),
        })?;

    let mut hour_columns: Vec<(u32, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(index, header)| {
            let hour = header.strip_prefix(HOUR_COLUMN_PREFIX)?.parse().ok()?;
            Some((hour, index))
        })
        .collect();
    hour_columns.sort_unstable();
    if hour_columns.is_empty() {
        return Err(ExperimentError::MissingColumn {
            path: path.to_path_buf(),
            column: format!("{HOUR_COLUMN_PREFIX}<hour>"),
        });
    }

    let mut hours = vec![zero_shares(); hour_columns.len()];
    let mut rows = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let name = record.get(type_column).unwrap_or_default();
        for (slot, (_, column)) in hour_columns.iter().enumerate() {
            let value = record.get(*column).unwrap_or_default();
            let header = headers.get(*column).unwrap_or_default();
            let share = parse_f64(path, row + 1, header, value)?;
            let target = share_slot(&mut hours[slot], name).ok_or_else(|| {
                ExperimentError::UnknownExamType {
                    path: path.to_path_buf(),
                    name: name.to_string(),
                }
            })?;
            *target += share;
        }
        rows += 1;
    }
    if rows == 0 {
        return Err(ExperimentError::EmptyTable {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!(
        path = %path.display(),
        hours = hours.len(),
        first_hour = hour_columns[0].0,
        "loaded exam mix"
    );
    Ok(ExamMix(hours))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn arrivals_double_last_hour() {
        let file = write_csv("hour,avg\n7,8\n8,14\n9,5\n");
        let schedule = load_hourly_arrivals(file.path()).expect("schedule");
        assert_eq!(schedule.0, vec![8.0, 14.0, 10.0]);
    }

    #[test]
    fn arrivals_require_avg_column() {
        let file = write_csv("hour,mean\n7,8\n");
        assert!(matches!(
            load_hourly_arrivals(file.path()),
            Err(ExperimentError::MissingColumn { .. })
        ));
    }

    #[test]
    fn arrivals_reject_non_numeric_rates() {
        let file = write_csv("avg\n8\nmany\n");
        assert!(matches!(
            load_hourly_arrivals(file.path()),
            Err(ExperimentError::InvalidValue { row: 2, .. })
        ));
    }

    #[test]
    fn exam_mix_orders_hours_and_maps_labels() {
        let file = write_csv(
            "exam_type_new,h_8,h_7\n\
             Screen Mammo,0.5,0.6\n\
             Dx Mammo + Dx US,0.1,0.1\n\
             Dx Mammo,0.1,0.05\n\
             Dx US,0.1,0.1\n\
             Bx US,0.05,0.05\n\
             Bx Mammo,0.05,0.04\n\
             Screen US,0.05,0.03\n\
             Bx MRI,0.03,0.02\n\
             MRI,0.02,0.01\n",
        );
        let mix = load_exam_mix(file.path()).expect("mix");
        assert_eq!(mix.hours(), 2);
        assert_eq!(mix.0[0].screen_mammo, 0.6);
        assert_eq!(mix.0[1].screen_mammo, 0.5);
        assert_eq!(mix.0[0].other_mri, 0.01);
        assert!((mix.0[1].total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn exam_mix_rejects_unknown_labels() {
        let file = write_csv("exam_type,h_7\nCT,1.0\n");
        assert!(matches!(
            load_exam_mix(file.path()),
            Err(ExperimentError::UnknownExamType { .. })
        ));
    }
}
