// src/infra/batch.rs

//! Batch-cluster backend (PBS-style `qsub`).

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{error, info};

use super::{
    commit_batch, ensure_basedir, write_script, Infrastructure, JobOutcome, JobStatus, RunReport,
};
use crate::errors::{BenchmatrixError, Result};
use crate::job::{BatchDirectives, Job, RenderScript};
use crate::manifest::OutputFiles;

/// External submission command, e.g. `qsub`.
///
/// Invoked per job as `<program> <args..> -o <stdout> -e <stderr> <script>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Hands every job to an external scheduler.
///
/// `run` returns once the scheduler has *accepted* each job; when the jobs
/// actually execute is invisible from here. Use [`super::status::status`] to
/// poll for output before analysing.
#[derive(Debug)]
pub struct BatchCluster {
    name: String,
    basedir: PathBuf,
    submit: SubmitCommand,
    directives: BatchDirectives,
    jobs: Vec<Job>,
    submitted: Vec<Job>,
}

impl BatchCluster {
    pub fn new(
        name: impl Into<String>,
        basedir: impl Into<PathBuf>,
        submit: SubmitCommand,
        directives: BatchDirectives,
    ) -> Self {
        Self {
            name: name.into(),
            basedir: basedir.into(),
            submit,
            directives,
            jobs: Vec::new(),
            submitted: Vec::new(),
        }
    }

    /// Jobs accepted by the scheduler, in submission order.
    pub fn submitted(&self) -> &[Job] {
        &self.submitted
    }

    async fn submit_one(&self, job: &Job) -> Result<String> {
        let short_id = job.short_id();
        let files = OutputFiles::new(&self.basedir, short_id);
        let script = self.basedir.join(format!("{short_id}.pbs"));
        write_script(&script, &job.render_script())?;

        // The scheduler runs the job elsewhere, later: hand it absolute paths.
        let stdout = std::path::absolute(&files.stdout)?;
        let stderr = std::path::absolute(&files.stderr)?;
        let script = std::path::absolute(&script)?;

        let output = Command::new(&self.submit.program)
            .args(&self.submit.args)
            .arg("-o")
            .arg(&stdout)
            .arg("-e")
            .arg(&stderr)
            .arg(&script)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(BenchmatrixError::Submission {
                short_id: short_id.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Infrastructure for BatchCluster {
    fn name(&self) -> &str {
        &self.name
    }

    fn basedir(&self) -> &Path {
        &self.basedir
    }

    fn new_job(&self) -> Job {
        let mut job = Job::batch();
        if let Some(batch) = job.as_batch_mut() {
            self.directives.apply(batch);
        }
        job
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

    /// Submit in schedule order. The first rejected submission stops the
    /// loop; it and every job after it stay scheduled.
    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<RunReport>> + Send + '_>> {
        Box::pin(async move {
            let mut pending = std::mem::take(&mut self.jobs).into_iter();
            let mut report = RunReport::default();

            while let Some(job) = pending.next() {
                match self.submit_one(&job).await {
                    Ok(scheduler_id) => {
                        info!(
                            short_id = %job.short_id(),
                            scheduler_id = %scheduler_id,
                            "job submitted"
                        );
                        report
                            .outcomes
                            .push(JobOutcome::new(&job, JobStatus::Submitted { scheduler_id }));
                        self.submitted.push(job);
                    }
                    Err(err) => {
                        error!(short_id = %job.short_id(), error = %err, "submission failed");
                        self.jobs = std::iter::once(job).chain(pending).collect();
                        return Err(err);
                    }
                }
            }

            Ok(report)
        })
    }
}
