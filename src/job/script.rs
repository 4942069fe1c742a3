// src/job/script.rs

//! Plain bash-script job.

use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use super::{
    short_id_of, JobCommand, RenderScript, META_BENCHMARK, META_CONFIGURATION, META_INVOCATION,
};
use crate::types::EnvMap;

pub const SHEBANG: &str = "#!/bin/bash";

/// Free-form job metadata.
pub type Metadata = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptJob {
    id: Uuid,
    short_id: String,
    commands: Vec<JobCommand>,
    env: EnvMap,
    metadata: Metadata,
    finished: bool,
}

impl Default for ScriptJob {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptJob {
    /// Create an empty job with a fresh identity.
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            short_id: short_id_of(&id),
            id,
            commands: Vec::new(),
            env: EnvMap::new(),
            metadata: Metadata::new(),
            finished: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn short_id(&self) -> &str {
        &self.short_id
    }

    pub fn commands(&self) -> &[JobCommand] {
        &self.commands
    }

    pub fn env(&self) -> &EnvMap {
        &self.env
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Append a command; insertion order is execution order.
    ///
    /// # Panics
    ///
    /// Panics if `args` is empty.
    pub fn add_command<I, S>(&mut self, args: I, env: EnvMap)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        assert!(!args.is_empty(), "a job command needs at least one argument");
        self.commands.push(JobCommand { args, env });
    }

    /// Merge into the job environment. Later writes win per key.
    pub fn set_env(&mut self, env: EnvMap) {
        self.env.extend(env);
    }

    pub fn set_metadata<I, K>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.metadata
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
    }

    pub fn benchmark(&self) -> Option<&str> {
        self.metadata.get(META_BENCHMARK).and_then(Value::as_str)
    }

    pub fn invocation(&self) -> Option<u64> {
        self.metadata.get(META_INVOCATION).and_then(Value::as_u64)
    }

    pub fn configuration(&self) -> Option<&str> {
        self.metadata.get(META_CONFIGURATION).and_then(Value::as_str)
    }

    /// Mark the job as finished. Never reset once set.
    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    /// Give the job a brand new identity (used on short-id collisions).
    pub(crate) fn reassign_identity(&mut self) {
        self.id = Uuid::new_v4();
        self.short_id = short_id_of(&self.id);
    }
}

impl RenderScript for ScriptJob {
    fn render_script(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(1 + self.env.len() + self.commands.len());
        lines.push(SHEBANG.to_string());

        for (name, value) in &self.env {
            lines.push(format!("export {name}={value}"));
        }

        for cmd in &self.commands {
            let mut tokens: Vec<String> = cmd
                .env
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            tokens.extend(cmd.args.iter().cloned());
            lines.push(tokens.join(" "));
        }

        lines
    }
}
