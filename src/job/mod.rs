// src/job/mod.rs

//! Job model.
//!
//! A job is one addressable unit of work: an ordered list of commands, a
//! job-wide environment, free-form metadata and a UUID identity. There are
//! two concrete forms:
//!
//! - [`ScriptJob`] renders a portable bash script.
//! - [`BatchJob`] wraps a `ScriptJob` and adds scheduler directive lines
//!   right after the shebang.
//!
//! [`Job`] is the closed set of both, which is what infrastructures hand out
//! and accept.

pub mod batch;
pub mod script;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::EnvMap;

pub use batch::{BatchDirectives, BatchJob, DIRECTIVE_PREFIX};
pub use script::{Metadata, ScriptJob, SHEBANG};

/// Number of hex characters kept in a short id.
pub const SHORT_ID_LEN: usize = 8;

pub const META_BENCHMARK: &str = "benchmark";
pub const META_INVOCATION: &str = "invocation";
pub const META_CONFIGURATION: &str = "configuration";
pub const META_DRIVER_ARGS: &str = "driver_args";

/// Short, filename-friendly prefix of a job id.
pub fn short_id_of(id: &Uuid) -> String {
    id.simple().to_string()[..SHORT_ID_LEN].to_string()
}

/// One command of a job together with its per-command environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCommand {
    pub args: Vec<String>,
    #[serde(default)]
    pub env: EnvMap,
}

/// Anything that can be turned into a shell script, line by line.
pub trait RenderScript {
    fn render_script(&self) -> Vec<String>;
}

/// A job as handed out by an infrastructure.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Script(ScriptJob),
    Batch(BatchJob),
}

impl Job {
    pub fn script() -> Self {
        Job::Script(ScriptJob::new())
    }

    pub fn batch() -> Self {
        Job::Batch(BatchJob::new())
    }

    /// Shared script-level part of the job.
    pub fn base(&self) -> &ScriptJob {
        match self {
            Job::Script(job) => job,
            Job::Batch(job) => job.base(),
        }
    }

    pub fn base_mut(&mut self) -> &mut ScriptJob {
        match self {
            Job::Script(job) => job,
            Job::Batch(job) => job.base_mut(),
        }
    }

    pub fn as_batch_mut(&mut self) -> Option<&mut BatchJob> {
        match self {
            Job::Batch(job) => Some(job),
            Job::Script(_) => None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.base().id()
    }

    pub fn short_id(&self) -> &str {
        self.base().short_id()
    }

    pub fn add_command<I, S>(&mut self, args: I, env: EnvMap)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_mut().add_command(args, env);
    }

    pub fn set_env(&mut self, env: EnvMap) {
        self.base_mut().set_env(env);
    }

    pub fn set_metadata<I, K>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.base_mut().set_metadata(entries);
    }

    /// Attach the three keys that identify this job's matrix cell.
    pub fn tag_cell(&mut self, benchmark: &str, invocation: usize, configuration: &str) {
        self.set_metadata([
            (META_BENCHMARK, Value::from(benchmark)),
            (META_INVOCATION, Value::from(invocation)),
            (META_CONFIGURATION, Value::from(configuration)),
        ]);
    }

    pub fn is_finished(&self) -> bool {
        self.base().is_finished()
    }

    /// Sort key used by every infrastructure at schedule time:
    /// (benchmark, invocation, configuration).
    pub fn schedule_key(&self) -> (String, u64, String) {
        let base = self.base();
        (
            base.benchmark().unwrap_or_default().to_string(),
            base.invocation().unwrap_or_default(),
            base.configuration().unwrap_or_default().to_string(),
        )
    }
}

impl RenderScript for Job {
    fn render_script(&self) -> Vec<String> {
        match self {
            Job::Script(job) => job.render_script(),
            Job::Batch(job) => job.render_script(),
        }
    }
}
