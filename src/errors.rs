// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchmatrixError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("invocation count not set (or zero); call set_invocations with at least 1 before starting a run")]
    InvocationsUnset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("malformed manifest line {line}: {message}")]
    Manifest { line: usize, message: String },

    #[error("submission of job {short_id} failed (exit code {code:?}): {stderr}")]
    Submission {
        short_id: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{action} failed for {} pair(s): {}", failures.len(), failures.join("; "))]
    PairFailures {
        action: &'static str,
        failures: Vec<String>,
    },

    #[error("command `{command}` exited with {code:?}")]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("pipeline '{stage}' failed: {message}")]
    Pipeline { stage: String, message: String },

    #[error("Unknown benchmark: {0}")]
    UnknownBenchmark(String),

    #[error("Unknown pipeline: {0}")]
    UnknownPipeline(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BenchmatrixError>;
