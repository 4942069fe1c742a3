use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use benchmatrix::benchmark::{Benchmark, Configuration};
use benchmatrix::errors::{BenchmatrixError, Result};
use benchmatrix::infra::{sort_for_schedule, Infrastructure, JobOutcome, JobStatus, RunReport};
use benchmatrix::job::Job;
use benchmatrix::pipeline::Pipeline;
use benchmatrix::types::{EnvMap, Stats};

/// Benchmark that never touches the shell.
///
/// `parse` reads `key value` or `key=value` lines from stdout. Build and
/// clean calls are recorded as `"<action>:<benchmark>/<configuration>"`.
#[derive(Debug, Clone, Default)]
pub struct FakeBenchmark {
    pub name: String,
    pub command: Vec<String>,
    pub fail_build_for: Option<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub pipeline_names: Vec<String>,
}

impl FakeBenchmark {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            command: vec![format!("./{name}")],
            ..Self::default()
        }
    }

    /// Make `build` fail for this configuration.
    pub fn failing_build_for(mut self, configuration: &str) -> Self {
        self.fail_build_for = Some(configuration.to_string());
        self
    }

    pub fn with_pipeline(mut self, name: &str) -> Self {
        self.pipeline_names.push(name.to_string());
        self
    }

    pub fn with_calls(mut self, calls: Arc<Mutex<Vec<String>>>) -> Self {
        self.calls = calls;
        self
    }

    fn record(&self, action: &str, configuration: &dyn Configuration) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{action}:{}/{}", self.name, configuration.name()));
    }
}

impl Benchmark for FakeBenchmark {
    fn name(&self) -> &str {
        &self.name
    }

    fn command(&self) -> Vec<String> {
        self.command.clone()
    }

    fn build(&self, configuration: &dyn Configuration) -> Result<()> {
        self.record("build", configuration);
        if self.fail_build_for.as_deref() == Some(configuration.name()) {
            return Err(BenchmatrixError::CommandFailed {
                command: format!("build {}", self.name),
                code: Some(2),
            });
        }
        Ok(())
    }

    fn clean(&self, configuration: &dyn Configuration) -> Result<()> {
        self.record("clean", configuration);
        Ok(())
    }

    fn parse(&self, stdout: &str, _stderr: &str) -> Result<Stats> {
        let mut stats = Stats::new();
        for line in stdout.lines() {
            let mut parts = line.splitn(2, |c: char| c == '=' || c.is_whitespace());
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            if let Ok(v) = value.trim().parse::<f64>() {
                stats.insert(key.trim().to_string(), v);
            }
        }
        if stats.is_empty() {
            return Err(BenchmatrixError::Parse(format!(
                "{}: nothing to parse",
                self.name
            )));
        }
        Ok(stats)
    }

    fn pipelines(&self) -> Vec<Box<dyn Pipeline>> {
        self.pipeline_names
            .iter()
            .filter_map(|n| benchmatrix::pipeline::builtin::by_name(n))
            .collect()
    }
}

/// Configuration relying entirely on the trait's default `realize`.
#[derive(Debug, Clone, Default)]
pub struct FakeConfiguration {
    pub name: String,
    pub env: EnvMap,
}

impl FakeConfiguration {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            env: EnvMap::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }
}

impl Configuration for FakeConfiguration {
    fn name(&self) -> &str {
        &self.name
    }

    fn env(&self) -> EnvMap {
        self.env.clone()
    }
}

/// Infrastructure that records every scheduled batch and reports each job
/// as having exited 0, without running anything.
#[derive(Debug, Clone)]
pub struct RecordingInfrastructure {
    basedir: PathBuf,
    jobs: Vec<Job>,
    pub batches: Arc<Mutex<Vec<Vec<Job>>>>,
}

impl RecordingInfrastructure {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            jobs: Vec::new(),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Infrastructure for RecordingInfrastructure {
    fn name(&self) -> &str {
        "recording"
    }

    fn basedir(&self) -> &Path {
        &self.basedir
    }

    fn new_job(&self) -> Job {
        Job::script()
    }

    fn setup(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.basedir)?;
        Ok(())
    }

    fn schedule(&mut self, mut jobs: Vec<Job>) -> Result<()> {
        sort_for_schedule(&mut jobs);
        self.batches.lock().unwrap().push(jobs.clone());
        self.jobs = jobs;
        Ok(())
    }

    fn scheduled(&self) -> &[Job] {
        &self.jobs
    }

    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<RunReport>> + Send + '_>> {
        let jobs = std::mem::take(&mut self.jobs);
        Box::pin(async move {
            let outcomes = jobs
                .iter()
                .map(|job| JobOutcome::new(job, JobStatus::Exited(0)))
                .collect();
            Ok(RunReport { outcomes })
        })
    }
}
