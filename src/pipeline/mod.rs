// src/pipeline/mod.rs

//! Post-processing chains.
//!
//! Each benchmark owns an ordered list of [`Pipeline`] stages. Analysis
//! folds the list over that benchmark's grouped results: the first stage
//! receives [`PipelineData::Grouped`], every later stage receives whatever
//! its predecessor returned, and the last stage's output is the artifact.
//!
//! Stages never hold a reference to the driver. They get a read-only
//! [`DriverView`] through [`PipelineContext`] on every call.

pub mod builtin;

use std::fmt::Debug;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::analysis::BenchmarkResults;
use crate::errors::Result;
use crate::types::ArgMap;

/// Read-only snapshot of the driver state stages may consult.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriverView {
    pub benchmarks: Vec<String>,
    pub configurations: Vec<String>,
    pub args: ArgMap,
}

pub struct PipelineContext<'a> {
    pub driver: &'a DriverView,
    pub benchmark: &'a str,
}

/// Value threaded through a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineData {
    /// configuration -> argument set -> stats, as produced by regrouping.
    Grouped(BenchmarkResults),
    /// Anything a stage chose to turn the results into.
    Value(Value),
}

impl PipelineData {
    /// JSON form written to the analysis artifact.
    pub fn into_json(self) -> Value {
        match self {
            PipelineData::Value(v) => v,
            PipelineData::Grouped(results) => {
                let configs: Map<String, Value> = results
                    .into_iter()
                    .map(|(configuration, by_args)| {
                        let groups: Vec<Value> = by_args
                            .into_iter()
                            .map(|(args, stats)| json!({ "args": args.to_json(), "stats": stats }))
                            .collect();
                        (configuration, Value::Array(groups))
                    })
                    .collect();
                Value::Object(configs)
            }
        }
    }
}

pub trait Pipeline: Send + Sync + Debug {
    /// Label used in logs only.
    fn name(&self) -> &str;

    fn process(&self, ctx: &PipelineContext<'_>, data: PipelineData) -> Result<PipelineData>;
}

/// Feed `data` through `stages` in order.
pub fn run_chain(
    stages: &[Box<dyn Pipeline>],
    ctx: &PipelineContext<'_>,
    data: PipelineData,
) -> Result<PipelineData> {
    stages.iter().try_fold(data, |data, stage| {
        info!(
            benchmark = ctx.benchmark,
            pipeline = stage.name(),
            "feeding through pipeline"
        );
        stage.process(ctx, data)
    })
}
