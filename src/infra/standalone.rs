// src/infra/standalone.rs

//! Sequential local backend.

use std::fs::{self, File};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, info};

use super::{
    commit_batch, ensure_basedir, write_script, Infrastructure, JobOutcome, JobStatus, RunReport,
};
use crate::errors::Result;
use crate::job::{Job, RenderScript};
use crate::manifest::OutputFiles;

/// Runs each job on this host and waits for it before starting the next.
///
/// Exit codes never stop the batch: every job is attempted, and its status
/// is written to `<shortId>.exit` next to the captured output.
#[derive(Debug)]
pub struct Standalone {
    name: String,
    basedir: PathBuf,
    jobs: Vec<Job>,
    finished: Vec<Job>,
}

impl Standalone {
    pub fn new(name: impl Into<String>, basedir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            basedir: basedir.into(),
            jobs: Vec::new(),
            finished: Vec::new(),
        }
    }

    /// Jobs that have been executed by this instance, oldest first.
    pub fn finished(&self) -> &[Job] {
        &self.finished
    }
}

impl Infrastructure for Standalone {
    fn name(&self) -> &str {
        &self.name
    }

    fn basedir(&self) -> &Path {
        &self.basedir
    }

    fn new_job(&self) -> Job {
        Job::script()
    }

    fn setup(&mut self) -> Result<()> {
        ensure_basedir(&self.basedir)
    }

    fn schedule(&mut self, jobs: Vec<Job>) -> Result<()> {
        self.jobs = commit_batch(&self.basedir, jobs)?;
        Ok(())
    }

    fn scheduled(&self) -> &[Job] {
        &self.jobs
    }

    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<RunReport>> + Send + '_>> {
        Box::pin(async move {
            let jobs = std::mem::take(&mut self.jobs);
            let mut report = RunReport::default();

            for mut job in jobs {
                let status = match execute(&self.basedir, &job).await {
                    Ok(status) => status,
                    Err(err) => {
                        error!(
                            short_id = %job.short_id(),
                            error = %err,
                            "failed to start job"
                        );
                        JobStatus::SpawnFailed(err.to_string())
                    }
                };
                job.base_mut().mark_finished();
                report.outcomes.push(JobOutcome::new(&job, status));
                self.finished.push(job);
            }

            Ok(report)
        })
    }
}

/// Render, run and record one job. Blocks (asynchronously) until it exits.
async fn execute(basedir: &Path, job: &Job) -> Result<JobStatus> {
    let short_id = job.short_id();
    let files = OutputFiles::new(basedir, short_id);
    let script = basedir.join(format!("{short_id}.sh"));
    write_script(&script, &job.render_script())?;

    let stdout = File::create(&files.stdout)?;
    let stderr = File::create(&files.stderr)?;

    info!(
        short_id = %short_id,
        benchmark = job.base().benchmark().unwrap_or("?"),
        configuration = job.base().configuration().unwrap_or("?"),
        invocation = job.base().invocation().unwrap_or_default(),
        "starting job"
    );

    let status = Command::new("bash")
        .arg(&script)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true)
        .status()
        .await;

    if let Err(e) = fs::remove_file(&script) {
        debug!(path = %script.display(), error = %e, "could not remove transient script");
    }

    let status = match status?.code() {
        Some(code) => JobStatus::Exited(code),
        None => JobStatus::Signalled,
    };

    let exit_record = match status {
        JobStatus::Exited(code) => code.to_string(),
        _ => "signal".to_string(),
    };
    fs::write(&files.exit, format!("{exit_record}\n"))?;

    info!(short_id = %short_id, status = ?status, "job exited");
    Ok(status)
}
