// src/analysis/mod.rs

//! Turn a run directory back into grouped statistics.
//!
//! Regrouping walks the manifest, keeps the entries of selected benchmarks
//! whose output is on disk, parses each with its benchmark and files the
//! result under (benchmark, configuration, driver args). The driver then
//! feeds every benchmark's group through that benchmark's pipelines.

pub mod group;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::benchmark::Benchmark;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::infra::status::read_exit_record;
use crate::manifest::{read_manifest, ManifestEntry, OutputFiles};

pub use group::{AnalysisWarning, ArgSet, BenchmarkResults, GroupingKey, Regrouped};

/// Subdirectory of a run directory that holds analysis artifacts.
pub const ANALYSIS_DIR: &str = "analysis";

/// Outcome of analysing one run directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    /// Final pipeline output per benchmark.
    pub artifacts: BTreeMap<String, Value>,
    /// Benchmarks whose pipeline chain failed, with the error text.
    pub failures: BTreeMap<String, String>,
    pub warnings: Vec<AnalysisWarning>,
    pub missing: Vec<String>,
}

/// Regroup every manifest entry under `dir` that belongs to one of
/// `benchmarks`.
pub fn regroup(
    fs: &dyn FileSystem,
    dir: &Path,
    benchmarks: &[Box<dyn Benchmark>],
) -> Result<Regrouped> {
    let entries = read_manifest(fs, dir)?;
    let mut out = Regrouped::default();

    for entry in &entries {
        let short_id = entry.short_id();

        let Some(benchmark) = entry
            .benchmark()
            .and_then(|name| benchmarks.iter().find(|b| b.name() == name))
        else {
            debug!(short_id = %short_id, benchmark = ?entry.benchmark(), "benchmark not selected; skipping");
            out.skipped += 1;
            continue;
        };

        let Some(key) = grouping_key(entry) else {
            out.warnings.push(AnalysisWarning {
                key: None,
                short_id,
                message: "manifest entry has no configuration".to_string(),
            });
            continue;
        };

        let files = OutputFiles::new(dir, &short_id);
        if !fs.is_file(&files.stdout) || !fs.is_file(&files.stderr) {
            debug!(short_id = %short_id, "output not present yet");
            out.missing.push(short_id);
            continue;
        }

        // Raw process output; decode lossily.
        let (stdout, stderr) = match (fs.read(&files.stdout), fs.read(&files.stderr)) {
            (Ok(o), Ok(e)) => (
                String::from_utf8_lossy(&o).into_owned(),
                String::from_utf8_lossy(&e).into_owned(),
            ),
            (Err(err), _) | (_, Err(err)) => {
                warn!(short_id = %short_id, error = %err, "unable to read job output");
                out.warnings.push(AnalysisWarning {
                    key: Some(key),
                    short_id,
                    message: format!("unreadable output: {err:#}"),
                });
                continue;
            }
        };

        if let Some(exit) = read_exit_record(fs, &files.exit)
            && !exit.is_success()
        {
            warn!(short_id = %short_id, key = %key, exit = ?exit, "job did not exit cleanly");
            out.warnings.push(AnalysisWarning {
                key: Some(key.clone()),
                short_id: short_id.clone(),
                message: format!("job exited with {exit:?}"),
            });
        }

        match benchmark.parse(&stdout, &stderr) {
            Ok(stats) => out.push(key, stats),
            Err(err) => {
                warn!(short_id = %short_id, key = %key, error = %err, "unable to parse job output");
                out.warnings.push(AnalysisWarning {
                    key: Some(key),
                    short_id,
                    message: err.to_string(),
                });
            }
        }
    }

    info!(
        dir = %dir.display(),
        entries = entries.len(),
        parsed = out.parsed(),
        missing = out.missing.len(),
        warnings = out.warnings.len(),
        "regrouped results"
    );
    Ok(out)
}

fn grouping_key(entry: &ManifestEntry) -> Option<GroupingKey> {
    Some(GroupingKey {
        benchmark: entry.benchmark()?.to_string(),
        configuration: entry.configuration()?.to_string(),
        args: ArgSet::from_args(&entry.driver_args()),
    })
}

/// Write `<dir>/analysis/<benchmark>.json` for every artifact in `report`.
pub fn write_artifacts(dir: &Path, report: &AnalysisReport) -> Result<Vec<PathBuf>> {
    let out_dir = dir.join(ANALYSIS_DIR);
    fs::create_dir_all(&out_dir)?;

    let mut written = Vec::with_capacity(report.artifacts.len());
    for (benchmark, artifact) in &report.artifacts {
        let path = out_dir.join(format!("{benchmark}.json"));
        let mut text = serde_json::to_string_pretty(artifact)?;
        text.push('\n');
        fs::write(&path, text)?;
        debug!(path = %path.display(), "wrote analysis artifact");
        written.push(path);
    }
    Ok(written)
}
