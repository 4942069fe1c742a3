// src/infra/status.rs

//! Completion polling for a run directory.
//!
//! A batch backend cannot observe when its jobs finish. Operators poll with
//! this instead: a manifest entry counts as complete once both of its output
//! files exist.

use std::path::Path;

use serde::Serialize;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::manifest::{read_manifest, ManifestEntry, OutputFiles};

/// Exit status recorded in a `<shortId>.exit` side file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRecord {
    Code(i32),
    Signal,
}

impl ExitRecord {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitRecord::Code(0))
    }
}

/// Read an exit side file. Absent or unreadable files yield `None`.
pub fn read_exit_record(fs: &dyn FileSystem, path: &Path) -> Option<ExitRecord> {
    if !fs.is_file(path) {
        return None;
    }
    let text = fs.read_to_string(path).ok()?;
    match text.trim() {
        "signal" => Some(ExitRecord::Signal),
        code => code.parse().ok().map(ExitRecord::Code),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    Pending,
    Completed { exit: Option<ExitRecord> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobProgress {
    pub short_id: String,
    pub benchmark: Option<String>,
    pub configuration: Option<String>,
    pub progress: Progress,
}

/// Per-entry progress, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub jobs: Vec<JobProgress>,
}

impl StatusSummary {
    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn completed(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| matches!(j.progress, Progress::Completed { .. }))
            .count()
    }

    pub fn pending(&self) -> impl Iterator<Item = &JobProgress> {
        self.jobs
            .iter()
            .filter(|j| j.progress == Progress::Pending)
    }

    pub fn is_finished(&self) -> bool {
        self.completed() == self.total()
    }
}

pub fn status(fs: &dyn FileSystem, dir: &Path) -> Result<StatusSummary> {
    let entries = read_manifest(fs, dir)?;
    let jobs = entries
        .iter()
        .map(|entry| progress_of(fs, dir, entry))
        .collect();
    Ok(StatusSummary { jobs })
}

fn progress_of(fs: &dyn FileSystem, dir: &Path, entry: &ManifestEntry) -> JobProgress {
    let short_id = entry.short_id();
    let files = OutputFiles::new(dir, &short_id);
    let progress = if fs.is_file(&files.stdout) && fs.is_file(&files.stderr) {
        Progress::Completed {
            exit: read_exit_record(fs, &files.exit),
        }
    } else {
        Progress::Pending
    };

    JobProgress {
        short_id,
        benchmark: entry.benchmark().map(str::to_string),
        configuration: entry.configuration().map(str::to_string),
        progress,
    }
}
