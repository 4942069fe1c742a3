// src/pipeline/builtin.rs

//! Stages addressable by name from the matrix file.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use tracing::debug;

use super::{Pipeline, PipelineContext, PipelineData};
use crate::errors::{BenchmatrixError, Result};
use crate::types::Stats;

pub const NAMES: &[&str] = &["passthrough", "summary"];

pub fn by_name(name: &str) -> Option<Box<dyn Pipeline>> {
    match name {
        "passthrough" => Some(Box::new(Passthrough::new("passthrough"))),
        "summary" => Some(Box::new(Summary)),
        _ => None,
    }
}

/// Returns its input unchanged.
#[derive(Debug, Clone)]
pub struct Passthrough {
    name: String,
}

impl Passthrough {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Pipeline for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &PipelineContext<'_>, data: PipelineData) -> Result<PipelineData> {
        debug!(benchmark = ctx.benchmark, stage = %self.name, "passing results through");
        Ok(data)
    }
}

/// Per grouping key: invocation count and mean / stddev / min / max of
/// every metric.
///
/// ```json
/// {
///   "benchmark": "fib",
///   "driver_args": {"heap": "64M"},
///   "configurations": {
///     "o3": [{"args": {...}, "invocations": 20,
///             "metrics": {"time": {"count": 20, "mean": 1.2, ...}}}]
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Summary;

impl Pipeline for Summary {
    fn name(&self) -> &str {
        "summary"
    }

    fn process(&self, ctx: &PipelineContext<'_>, data: PipelineData) -> Result<PipelineData> {
        let PipelineData::Grouped(results) = data else {
            return Err(BenchmatrixError::Pipeline {
                stage: self.name().to_string(),
                message: "expects grouped results; place it first in the chain".to_string(),
            });
        };

        let mut configurations = Map::new();
        for (configuration, by_args) in results {
            let groups: Vec<Value> = by_args
                .into_iter()
                .map(|(args, stats)| {
                    json!({
                        "args": args.to_json(),
                        "invocations": stats.len(),
                        "metrics": summarize(&stats),
                    })
                })
                .collect();
            debug!(benchmark = ctx.benchmark, configuration = %configuration, groups = groups.len(), "summarized");
            configurations.insert(configuration, Value::Array(groups));
        }

        Ok(PipelineData::Value(json!({
            "benchmark": ctx.benchmark,
            "driver_args": ctx.driver.args,
            "configurations": configurations,
        })))
    }
}

/// Metric name -> descriptive statistics across invocations.
fn summarize(stats: &[Stats]) -> BTreeMap<String, Value> {
    let mut samples: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for s in stats {
        for (metric, value) in s {
            samples.entry(metric.as_str()).or_default().push(*value);
        }
    }

    samples
        .into_iter()
        .map(|(metric, values)| {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let stddev = if values.len() > 1 {
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
                var.sqrt()
            } else {
                0.0
            };
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (
                metric.to_string(),
                json!({
                    "count": values.len(),
                    "mean": mean,
                    "stddev": stddev,
                    "min": min,
                    "max": max,
                }),
            )
        })
        .collect()
}
