// src/manifest.rs

//! The `MANIFEST` ledger.
//!
//! One line per scheduled job, written before the job executes:
//!
//! ```text
//! <uuid>\t<json env>\t<json commands>\t<json metadata>\n
//! ```
//!
//! The file is only ever appended to. Compact JSON never contains a raw tab
//! or newline, so the four fields split unambiguously.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{BenchmatrixError, Result};
use crate::fs::FileSystem;
use crate::job::{
    short_id_of, Job, JobCommand, Metadata, META_BENCHMARK, META_CONFIGURATION, META_DRIVER_ARGS,
};
use crate::types::{ArgMap, EnvMap};

pub const MANIFEST_FILE: &str = "MANIFEST";

/// Decoded manifest line.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub id: Uuid,
    pub env: EnvMap,
    pub commands: Vec<JobCommand>,
    pub metadata: Metadata,
}

impl ManifestEntry {
    pub fn from_job(job: &Job) -> Self {
        let base = job.base();
        Self {
            id: base.id(),
            env: base.env().clone(),
            commands: base.commands().to_vec(),
            metadata: base.metadata().clone(),
        }
    }

    pub fn short_id(&self) -> String {
        short_id_of(&self.id)
    }

    pub fn benchmark(&self) -> Option<&str> {
        self.metadata.get(META_BENCHMARK).and_then(|v| v.as_str())
    }

    pub fn configuration(&self) -> Option<&str> {
        self.metadata.get(META_CONFIGURATION).and_then(|v| v.as_str())
    }

    /// Driver arguments recorded for this job; empty when absent.
    pub fn driver_args(&self) -> ArgMap {
        match self.metadata.get(META_DRIVER_ARGS) {
            Some(serde_json::Value::Object(map)) => {
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
            }
            _ => ArgMap::new(),
        }
    }

    /// Encode as one manifest line, without the trailing newline.
    pub fn encode(&self) -> Result<String> {
        Ok(format!(
            "{}\t{}\t{}\t{}",
            self.id.hyphenated(),
            serde_json::to_string(&self.env)?,
            serde_json::to_string(&self.commands)?,
            serde_json::to_string(&self.metadata)?,
        ))
    }

    /// Decode one manifest line. `line_no` is 1-based and only used for errors.
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        let malformed = |message: String| BenchmatrixError::Manifest {
            line: line_no,
            message,
        };

        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        let [id, env, commands, metadata] = fields.as_slice() else {
            return Err(malformed(format!(
                "expected 4 tab-separated fields, got {}",
                fields.len()
            )));
        };

        let id = Uuid::parse_str(id).map_err(|e| malformed(format!("bad job id: {e}")))?;
        let env = serde_json::from_str(env).map_err(|e| malformed(format!("bad env: {e}")))?;
        let commands = serde_json::from_str(commands)
            .map_err(|e| malformed(format!("bad command list: {e}")))?;
        let metadata = serde_json::from_str(metadata)
            .map_err(|e| malformed(format!("bad metadata: {e}")))?;

        Ok(Self {
            id,
            env,
            commands,
            metadata,
        })
    }
}

/// Paths of the files a job leaves behind in its base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
    /// Exit status side file; only written by the standalone backend.
    pub exit: PathBuf,
}

impl OutputFiles {
    pub fn new(dir: &Path, short_id: &str) -> Self {
        Self {
            stdout: dir.join(format!("{short_id}.o")),
            stderr: dir.join(format!("{short_id}.e")),
            exit: dir.join(format!("{short_id}.exit")),
        }
    }
}

/// Append one line per job to `<dir>/MANIFEST`, creating the file if needed.
pub fn append(dir: &Path, jobs: &[Job]) -> Result<()> {
    let path = dir.join(MANIFEST_FILE);
    let mut buf = String::new();
    for job in jobs {
        buf.push_str(&ManifestEntry::from_job(job).encode()?);
        buf.push('\n');
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(buf.as_bytes())?;
    file.flush()?;

    debug!(path = %path.display(), count = jobs.len(), "appended manifest lines");
    Ok(())
}

/// Decode manifest text.
///
/// Blank lines are ignored. Malformed lines are returned alongside the good
/// entries instead of failing the whole read.
pub fn parse_manifest(contents: &str) -> (Vec<ManifestEntry>, Vec<BenchmatrixError>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match ManifestEntry::parse(line, idx + 1) {
            Ok(entry) => entries.push(entry),
            Err(e) => errors.push(e),
        }
    }

    (entries, errors)
}

/// Read `<dir>/MANIFEST`. A missing directory or manifest is a configuration
/// error.
pub fn read_manifest(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<ManifestEntry>> {
    if !fs.is_dir(dir) {
        return Err(BenchmatrixError::ConfigError(format!(
            "run directory {} does not exist",
            dir.display()
        )));
    }

    let path = dir.join(MANIFEST_FILE);
    if !fs.is_file(&path) {
        return Err(BenchmatrixError::ConfigError(format!(
            "no {MANIFEST_FILE} found in {}",
            dir.display()
        )));
    }

    let contents = fs.read_to_string(&path)?;
    let (entries, errors) = parse_manifest(&contents);
    for err in &errors {
        warn!(path = %path.display(), error = %err, "skipping manifest line");
    }
    Ok(entries)
}
