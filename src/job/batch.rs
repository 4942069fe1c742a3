// src/job/batch.rs

//! Batch-scheduler job: a [`ScriptJob`] plus `#PBS` directive lines.
//!
//! Every setter appends exactly one directive and does no validation. The
//! scheduler that eventually reads the script is the authority on what is
//! a valid queue name, walltime, memory size and so on.

use serde::Deserialize;

use super::{RenderScript, ScriptJob};

pub const DIRECTIVE_PREFIX: &str = "#PBS";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchJob {
    script: ScriptJob,
    directives: Vec<String>,
}

impl BatchJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(&self) -> &ScriptJob {
        &self.script
    }

    pub fn base_mut(&mut self) -> &mut ScriptJob {
        &mut self.script
    }

    /// Raw directive strings, in the order they were added.
    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    /// Append an arbitrary directive (without the `#PBS` prefix).
    pub fn add_directive(&mut self, directive: impl Into<String>) {
        self.directives.push(directive.into());
    }

    /// Project the job's resource usage is charged to.
    pub fn set_project(&mut self, project: impl std::fmt::Display) {
        self.add_directive(format!("-P {project}"));
    }

    pub fn set_queue(&mut self, queue: impl std::fmt::Display) {
        self.add_directive(format!("-q {queue}"));
    }

    /// Wall clock limit, `[[hours:]minutes:]seconds` or plain seconds.
    pub fn set_walltime(&mut self, walltime: impl std::fmt::Display) {
        self.add_directive(format!("-l walltime={walltime}"));
    }

    /// Total memory across all nodes, e.g. `4GB`.
    pub fn set_memory(&mut self, memory: impl std::fmt::Display) {
        self.add_directive(format!("-l mem={memory}"));
    }

    pub fn set_ncpus(&mut self, ncpus: impl std::fmt::Display) {
        self.add_directive(format!("-l ncpus={ncpus}"));
    }

    /// Job scratch space reserved on the node.
    pub fn set_jobfs(&mut self, jobfs: impl std::fmt::Display) {
        self.add_directive(format!("-l jobfs={jobfs}"));
    }

    /// Licensed software, colon separated.
    pub fn set_software(&mut self, software: impl std::fmt::Display) {
        self.add_directive(format!("-l software={software}"));
    }

    /// Other attributes (`iobound`, `mdss`, ...), colon separated.
    pub fn set_other(&mut self, other: impl std::fmt::Display) {
        self.add_directive(format!("-l other={other}"));
    }

    /// Requeue the job if its node crashes.
    pub fn set_restartable(&mut self) {
        self.add_directive("-r y");
    }

    /// Start in the submission directory instead of `$HOME`.
    pub fn set_wd(&mut self) {
        self.add_directive("-l wd");
    }
}

impl RenderScript for BatchJob {
    fn render_script(&self) -> Vec<String> {
        let mut lines = self.script.render_script();
        let directives = self
            .directives
            .iter()
            .map(|d| format!("{DIRECTIVE_PREFIX} {d}"));
        // Directly after the shebang, before any export line.
        lines.splice(1..1, directives);
        lines
    }
}

/// Directives applied to every job a batch infrastructure hands out.
///
/// Mirrors `[infrastructure.directives]` in the matrix file:
///
/// ```toml
/// [infrastructure.directives]
/// project = "c25"
/// queue = "normal"
/// walltime = "01:00:00"
/// ncpus = 16
/// wd = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchDirectives {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub walltime: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub ncpus: Option<u32>,
    #[serde(default)]
    pub jobfs: Option<String>,
    #[serde(default)]
    pub software: Option<String>,
    #[serde(default)]
    pub other: Option<String>,
    #[serde(default)]
    pub restartable: bool,
    #[serde(default)]
    pub wd: bool,
}

impl BatchDirectives {
    /// Apply every configured directive, in field order.
    pub fn apply(&self, job: &mut BatchJob) {
        if let Some(ref project) = self.project {
            job.set_project(project);
        }
        if let Some(ref queue) = self.queue {
            job.set_queue(queue);
        }
        if let Some(ref walltime) = self.walltime {
            job.set_walltime(walltime);
        }
        if let Some(ref memory) = self.memory {
            job.set_memory(memory);
        }
        if let Some(ncpus) = self.ncpus {
            job.set_ncpus(ncpus);
        }
        if let Some(ref jobfs) = self.jobfs {
            job.set_jobfs(jobfs);
        }
        if let Some(ref software) = self.software {
            job.set_software(software);
        }
        if let Some(ref other) = self.other {
            job.set_other(other);
        }
        if self.restartable {
            job.set_restartable();
        }
        if self.wd {
            job.set_wd();
        }
    }
}
