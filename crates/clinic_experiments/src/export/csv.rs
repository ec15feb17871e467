use clinic_core::pathway::Station;
use clinic_core::telemetry::PatientRecord;

use crate::durations::derive_durations;
use crate::error::ExperimentError;

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub(crate) fn header() -> Vec<String> {
    let mut columns = vec![
        "patient_id".to_string(),
        "patient_type".to_string(),
        "arrival_ts".to_string(),
    ];
    for station in Station::ALL {
        columns.push(format!("got_{}_ts", station.name()));
        columns.push(format!("release_{}_ts", station.name()));
    }
    columns.push("exit_system_ts".to_string());
    for station in Station::ALL {
        columns.push(format!("wait_for_{}", station.name()));
    }
    for station in Station::ALL {
        columns.push(format!("{}_time", station.name()));
    }
    columns.push("time_in_system".to_string());
    columns
}

pub(crate) fn write_patient_log_impl(
    records: &[PatientRecord],
    file: std::fs::File,
) -> Result<(), ExperimentError> {
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(header())?;

    for record in records {
        let durations = derive_durations(record);
        let mut row = vec![
            record.patient_id.to_string(),
            record.patient_type.tag().to_string(),
            record.arrival_ts.to_string(),
        ];
        for station in Station::ALL {
            let visit = record.visit(station);
            row.push(optional(visit.got));
            row.push(optional(visit.release));
        }
        row.push(record.exit_ts.to_string());
        for station in Station::ALL {
            row.push(optional(durations.wait_for(station)));
        }
        for station in Station::ALL {
            row.push(optional(durations.dwell_at(station)));
        }
        row.push(durations.time_in_system.to_string());
        wtr.write_record(&row)?;
    }

    wtr.flush().map_err(|source| ExperimentError::Io {
        path: "<patient log>".into(),
        source,
    })?;
    Ok(())
}
