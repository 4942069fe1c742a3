// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{MatrixFile, RawMatrixFile};
use crate::errors::{BenchmatrixError, Result};

/// Load a matrix file from a given path without semantic validation.
///
/// Use [`load_and_validate`] for the checked [`MatrixFile`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawMatrixFile> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(BenchmatrixError::ConfigError(format!(
            "matrix file {} does not exist",
            path.display()
        )));
    }
    let contents = fs::read_to_string(path)?;

    let config: RawMatrixFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a matrix file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - an empty benchmark or configuration list,
///   - zero invocations / rounds,
///   - a batch backend without a submission command,
///   - metric regexes and unknown pipeline names.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<MatrixFile> {
    let raw_config = load_from_path(&path)?;
    let config = MatrixFile::try_from(raw_config)?;
    Ok(config)
}

/// Default matrix file location: `Benchmatrix.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Benchmatrix.toml")
}
