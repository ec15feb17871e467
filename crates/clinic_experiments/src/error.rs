use std::path::PathBuf;

use clinic_core::config::ConfigLoadError;
use clinic_core::error::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{path}: missing column `{column}`")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: row {row}, column `{column}`: cannot parse `{value}`")]
    InvalidValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("{path}: unknown exam type `{name}`")]
    UnknownExamType { path: PathBuf, name: String },

    #[error("{path}: table has no data rows")]
    EmptyTable { path: PathBuf },

    #[error("invalid flag combination: {0}")]
    ConflictingFlags(&'static str),

    #[error("requested {requested} trials but only {available} distinct seeds exist")]
    TooManyTrials { requested: usize, available: usize },

    #[error("failed to build the trial thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("no patient records to export")]
    NothingToExport,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    ConfigLoad(#[from] ConfigLoadError),
}
