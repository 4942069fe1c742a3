// src/config/mod.rs

//! Matrix file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a matrix file from disk (`loader.rs`).
//! - Validate it into a `MatrixFile` (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    BenchmarkConfig, ConfigurationConfig, DriverSection, InfrastructureSection, MatrixFile,
    RawMatrixFile,
};
