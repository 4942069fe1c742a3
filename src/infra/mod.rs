// src/infra/mod.rs

//! Execution backends.
//!
//! The driver talks to an [`Infrastructure`] instead of spawning processes
//! itself. Two backends exist:
//!
//! - [`standalone::Standalone`] runs jobs one after another on this host and
//!   waits for each to exit.
//! - [`batch::BatchCluster`] renders each job with scheduler directives and
//!   hands it to an external submission command (fire-and-forget).
//!
//! Both share the scheduling half: sort the batch, make short ids unique,
//! append the manifest. Tests can provide their own implementation that
//! records jobs instead of running them.

pub mod batch;
pub mod standalone;
pub mod status;

use std::collections::HashSet;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::model::InfrastructureSection;
use crate::errors::{BenchmatrixError, Result};
use crate::job::Job;
use crate::manifest::{self, MANIFEST_FILE};
use crate::types::InfrastructureKind;

pub use batch::{BatchCluster, SubmitCommand};
pub use standalone::Standalone;

/// Trait abstracting where and how scheduled jobs execute.
pub trait Infrastructure: Send {
    /// Run instance name; also the last component of `basedir`.
    fn name(&self) -> &str;

    /// Working directory holding the manifest and per-job output.
    fn basedir(&self) -> &Path;

    /// Construct an empty job of the kind this backend executes.
    fn new_job(&self) -> Job;

    /// Create `basedir` (and parents). Safe to call repeatedly.
    fn setup(&mut self) -> Result<()>;

    /// Take ownership of a batch and record it in the manifest.
    ///
    /// Replaces whatever batch was scheduled before.
    fn schedule(&mut self, jobs: Vec<Job>) -> Result<()>;

    /// Jobs scheduled but not yet run.
    fn scheduled(&self) -> &[Job];

    /// Execute or submit the scheduled batch, in schedule order.
    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<RunReport>> + Send + '_>>;
}

/// What happened to one job during `run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Process ran to completion with this exit code.
    Exited(i32),
    /// Process was terminated by a signal.
    Signalled,
    /// Process could not be started at all.
    SpawnFailed(String),
    /// Handed to the batch scheduler, which answered with this id.
    Submitted { scheduler_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub id: String,
    pub short_id: String,
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn new(job: &Job, status: JobStatus) -> Self {
        Self {
            id: job.id().hyphenated().to_string(),
            short_id: job.short_id().to_string(),
            status,
        }
    }
}

/// Result of one `Infrastructure::run` call, in execution/submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<JobOutcome>,
}

/// Construct the backend selected by `[infrastructure]`.
pub fn from_config(
    section: &InfrastructureSection,
    name: String,
    basedir: PathBuf,
) -> Box<dyn Infrastructure> {
    match section.kind {
        InfrastructureKind::Standalone => Box::new(Standalone::new(name, basedir)),
        InfrastructureKind::Batch => Box::new(BatchCluster::new(
            name,
            basedir,
            SubmitCommand {
                program: section.submit_command.clone(),
                args: section.submit_args.clone(),
            },
            section.directives.clone(),
        )),
    }
}

/// `<hostname>-<timestamp>`, used when a run is not explicitly named.
pub fn default_run_name() -> String {
    format!("{}-{}", hostname(), Local::now().format("%Y-%m-%d-%H%M%S"))
}

/// Best-effort host name without pulling in libc.
pub fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| fs::read_to_string("/proc/sys/kernel/hostname").ok())
        .or_else(|| fs::read_to_string("/etc/hostname").ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

pub(crate) fn ensure_basedir(basedir: &Path) -> Result<()> {
    fs::create_dir_all(basedir)?;
    Ok(())
}

/// Scheduling half shared by every backend.
///
/// Stable-sorts by (benchmark, invocation, configuration) so that an
/// interrupted run has completed comparable numbers of invocations for each
/// configuration, gives colliding jobs fresh identities, then appends the
/// manifest.
pub(crate) fn commit_batch(basedir: &Path, mut jobs: Vec<Job>) -> Result<Vec<Job>> {
    if !basedir.is_dir() {
        return Err(BenchmatrixError::ConfigError(format!(
            "base directory {} does not exist; call setup() first",
            basedir.display()
        )));
    }

    sort_for_schedule(&mut jobs);
    ensure_unique_short_ids(basedir, &mut jobs)?;
    manifest::append(basedir, &jobs)?;

    info!(
        basedir = %basedir.display(),
        count = jobs.len(),
        "scheduled jobs"
    );
    Ok(jobs)
}

pub fn sort_for_schedule(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| a.schedule_key().cmp(&b.schedule_key()));
}

/// Short ids must be unique within the batch and against every job already
/// recorded in `basedir`, since they name the output files.
fn ensure_unique_short_ids(basedir: &Path, jobs: &mut [Job]) -> Result<()> {
    let mut taken = existing_short_ids(basedir)?;

    for job in jobs.iter_mut() {
        while taken.contains(job.short_id())
            || basedir.join(format!("{}.o", job.short_id())).exists()
        {
            warn!(
                short_id = %job.short_id(),
                "short id collision; assigning a fresh identity"
            );
            job.base_mut().reassign_identity();
        }
        taken.insert(job.short_id().to_string());
    }
    Ok(())
}

fn existing_short_ids(basedir: &Path) -> Result<HashSet<String>> {
    let path = basedir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(HashSet::new());
    }
    let contents = fs::read_to_string(&path)?;
    let (entries, _errors) = manifest::parse_manifest(&contents);
    Ok(entries.iter().map(|e| e.short_id()).collect())
}

/// Write a rendered script and make it executable.
pub(crate) fn write_script(path: &Path, lines: &[String]) -> Result<()> {
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}
