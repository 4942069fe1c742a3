// src/types.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Driver-level and configuration-level arguments.
pub type ArgMap = BTreeMap<String, serde_json::Value>;

/// Environment variables, name -> value.
pub type EnvMap = BTreeMap<String, String>;

/// Statistics a benchmark extracts from one invocation's output.
pub type Stats = BTreeMap<String, f64>;

/// Which execution backend a matrix file selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InfrastructureKind {
    /// Run jobs one after another on the current host.
    Standalone,
    /// Render scheduler directives and hand each job to a submission command.
    Batch,
}

impl Default for InfrastructureKind {
    fn default() -> Self {
        InfrastructureKind::Standalone
    }
}

/// Output stream a benchmark's metrics are scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl Default for OutputStream {
    fn default() -> Self {
        OutputStream::Stdout
    }
}
