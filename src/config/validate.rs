// src/config/validate.rs

use regex::Regex;

use crate::config::model::{MatrixFile, RawMatrixFile};
use crate::errors::{BenchmatrixError, Result};
use crate::pipeline::builtin;
use crate::types::InfrastructureKind;

impl TryFrom<RawMatrixFile> for MatrixFile {
    type Error = crate::errors::BenchmatrixError;

    fn try_from(raw: RawMatrixFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(MatrixFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawMatrixFile) -> Result<()> {
    ensure_has_matrix(cfg)?;
    validate_driver(cfg)?;
    validate_infrastructure(cfg)?;
    validate_benchmarks(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> BenchmatrixError {
    BenchmatrixError::ConfigError(msg.into())
}

fn ensure_has_matrix(cfg: &RawMatrixFile) -> Result<()> {
    if cfg.benchmark.is_empty() {
        return Err(config_error(
            "matrix file must contain at least one [benchmark.<name>] section",
        ));
    }
    if cfg.configuration.is_empty() {
        return Err(config_error(
            "matrix file must contain at least one [configuration.<name>] section",
        ));
    }
    Ok(())
}

fn validate_driver(cfg: &RawMatrixFile) -> Result<()> {
    if cfg.driver.invocations == Some(0) {
        return Err(config_error("[driver].invocations must be >= 1 (got 0)"));
    }
    if cfg.driver.rounds == 0 {
        return Err(config_error("[driver].rounds must be >= 1 (got 0)"));
    }
    if let Some(ref name) = cfg.driver.name {
        if name.is_empty() || name.contains(std::path::is_separator) {
            return Err(config_error(format!(
                "[driver].name must be a non-empty single path component (got {name:?})"
            )));
        }
    }
    Ok(())
}

fn validate_infrastructure(cfg: &RawMatrixFile) -> Result<()> {
    if cfg.infrastructure.kind == InfrastructureKind::Batch
        && cfg.infrastructure.submit_command.trim().is_empty()
    {
        return Err(config_error(
            "[infrastructure].submit_command must be set when kind = \"batch\"",
        ));
    }
    Ok(())
}

fn validate_benchmarks(cfg: &RawMatrixFile) -> Result<()> {
    for (name, bm) in cfg.benchmark.iter() {
        if bm.command.is_empty() {
            return Err(config_error(format!(
                "benchmark '{name}' has an empty `command`"
            )));
        }

        if let Some(ref pattern) = bm.metric_pattern {
            let re = Regex::new(pattern).map_err(|e| {
                config_error(format!("benchmark '{name}' has an invalid metric_pattern: {e}"))
            })?;
            let groups: Vec<&str> = re.capture_names().flatten().collect();
            if !groups.contains(&"metric") || !groups.contains(&"value") {
                return Err(config_error(format!(
                    "benchmark '{name}' metric_pattern needs `metric` and `value` named groups"
                )));
            }
        }

        for pipeline in bm.pipelines.iter() {
            if !builtin::NAMES.contains(&pipeline.as_str()) {
                return Err(BenchmatrixError::UnknownPipeline(format!(
                    "'{pipeline}' in benchmark '{name}' (known: {})",
                    builtin::NAMES.join(", ")
                )));
            }
        }
    }
    Ok(())
}
