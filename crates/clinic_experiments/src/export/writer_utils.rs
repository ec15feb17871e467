use std::fs::{self, File};
use std::path::Path;

use crate::error::ExperimentError;

pub(crate) fn ensure_not_empty<T>(items: &[T]) -> Result<(), ExperimentError> {
    if items.is_empty() {
        return Err(ExperimentError::NothingToExport);
    }

    Ok(())
}

pub(crate) fn create_output_file(path: &Path) -> Result<File, ExperimentError> {
    let io_error = |source| ExperimentError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    File::create(path).map_err(io_error)
}
