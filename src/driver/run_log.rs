// src/driver/run_log.rs

//! Per-run bookkeeping and the `RUNINFO.json` record.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use crate::errors::Result;
use crate::infra::{hostname, JobStatus, RunReport};
use crate::types::ArgMap;

pub const RUNINFO_FILE: &str = "RUNINFO.json";

/// One schedule/run cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    pub index: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub report: RunReport,
}

impl RoundRecord {
    pub fn jobs(&self) -> usize {
        self.report.outcomes.len()
    }

    /// Jobs that exited non-zero, were signalled or never started.
    pub fn failures(&self) -> usize {
        self.report
            .outcomes
            .iter()
            .filter(|o| !matches!(o.status, JobStatus::Exited(0) | JobStatus::Submitted { .. }))
            .count()
    }
}

/// Machine the driver ran on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub cpus: usize,
}

impl HostInfo {
    pub fn current() -> Self {
        Self {
            hostname: hostname(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpus: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Everything `Driver::start` did, handed to the stop predicate after each
/// round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLog {
    pub name: String,
    pub basedir: PathBuf,
    pub host: HostInfo,
    pub invocations: usize,
    pub driver_args: ArgMap,
    pub rounds: Vec<RoundRecord>,
}

impl RunLog {
    pub fn new(name: &str, basedir: &Path, invocations: usize, driver_args: ArgMap) -> Self {
        Self {
            name: name.to_string(),
            basedir: basedir.to_path_buf(),
            host: HostInfo::current(),
            invocations,
            driver_args,
            rounds: Vec::new(),
        }
    }

    pub fn rounds_completed(&self) -> usize {
        self.rounds.len()
    }

    pub fn jobs_run(&self) -> usize {
        self.rounds.iter().map(RoundRecord::jobs).sum()
    }

    pub fn failures(&self) -> usize {
        self.rounds.iter().map(RoundRecord::failures).sum()
    }

    /// Rewrite `<basedir>/RUNINFO.json` with the current state.
    pub fn write(&self) -> Result<PathBuf> {
        let path = self.basedir.join(RUNINFO_FILE);
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(&path, text)?;
        debug!(path = %path.display(), rounds = self.rounds.len(), "updated run info");
        Ok(path)
    }
}
