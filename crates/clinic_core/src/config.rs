//! TOML loading for [ClinicParams].
//!
//! Every field is optional; anything missing keeps its default.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::error::ConfigError;
use crate::scenario::ClinicParams;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse clinic config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Parses and validates clinic parameters from TOML text.
pub fn parse_params(text: &str) -> Result<ClinicParams, ConfigLoadError> {
    let params: ClinicParams = toml::from_str(text)?;
    params.validate()?;
    Ok(params)
}

/// Loads and validates clinic parameters from a TOML file.
pub fn load_params(path: impl AsRef<Path>) -> Result<ClinicParams, ConfigLoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let params = parse_params(&text)?;
    tracing::info!(path = %path.display(), seed = params.seed, "loaded clinic config");
    Ok(params)
}
