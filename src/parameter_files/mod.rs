pub mod inverter_file;
pub mod module_file;
pub mod outline;

use crate::errors::CverError;
use outline::Outline;
use std::path::{Path, PathBuf};

pub(crate) fn numeric_value(outline: &Outline, key: &str, path: &Path) -> Result<f64, CverError> {
    outline
        .first(key)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .ok_or_else(|| missing(path, key))
}

pub(crate) fn missing(path: &Path, key: &str) -> CverError {
    CverError::MissingParameter {
        path: PathBuf::from(path),
        key: key.to_string(),
    }
}
