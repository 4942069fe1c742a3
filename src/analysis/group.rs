// src/analysis/group.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Value};

use crate::types::{ArgMap, Stats};

/// Canonical, order-independent form of a job's driver arguments.
///
/// Values are stored as compact JSON so that `{"a": 1}` and `{"a": "1"}`
/// stay distinct while two maps with the same contents always compare
/// equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArgSet(BTreeSet<(String, String)>);

impl ArgSet {
    pub fn from_args(args: &ArgMap) -> Self {
        Self(
            args.iter()
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Back to a JSON object, for artifacts.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(k, v)| {
                let value = serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.clone()));
                (k.clone(), value)
            })
            .collect();
        Value::Object(map)
    }
}

impl fmt::Display for ArgSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Identity of one results group: the same benchmark, configuration and
/// driver arguments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupingKey {
    pub benchmark: String,
    pub configuration: String,
    pub args: ArgSet,
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.benchmark, self.configuration, self.args)
    }
}

/// configuration -> argument set -> one `Stats` per parsed invocation.
pub type BenchmarkResults = BTreeMap<String, BTreeMap<ArgSet, Vec<Stats>>>;

/// Everything regrouping produced, keyed by benchmark name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Regrouped {
    pub results: BTreeMap<String, BenchmarkResults>,
    pub warnings: Vec<AnalysisWarning>,
    /// Short ids of entries whose output files are not there yet.
    pub missing: Vec<String>,
    /// Entries belonging to benchmarks that are not selected.
    pub skipped: usize,
}

impl Regrouped {
    pub(crate) fn push(&mut self, key: GroupingKey, stats: Stats) {
        self.results
            .entry(key.benchmark)
            .or_default()
            .entry(key.configuration)
            .or_default()
            .entry(key.args)
            .or_default()
            .push(stats);
    }

    /// Number of parsed invocations across all groups.
    pub fn parsed(&self) -> usize {
        self.results
            .values()
            .flat_map(|by_cfg| by_cfg.values())
            .flat_map(|by_args| by_args.values())
            .map(Vec::len)
            .sum()
    }
}

/// A job whose output was read but could not be used cleanly.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisWarning {
    pub key: Option<GroupingKey>,
    pub short_id: String,
    pub message: String,
}
