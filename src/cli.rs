// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `benchmatrix`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "benchmatrix",
    version,
    about = "Run a benchmark x configuration x invocation matrix and analyse the results.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the matrix file (TOML).
    #[arg(
        long,
        value_name = "PATH",
        default_value_os_t = default_config_path(),
        global = true
    )]
    pub config: PathBuf,

    /// Keep only these benchmarks (comma separated).
    #[arg(short = 'b', long, value_delimiter = ',', global = true)]
    pub benchmarks: Vec<String>,

    /// Keep only these configurations (comma separated).
    #[arg(short = 'c', long, value_delimiter = ',', global = true)]
    pub configurations: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BENCHMATRIX_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build every (benchmark, configuration) pair.
    Build,

    /// Clean every (benchmark, configuration) pair.
    Clean,

    /// Expand the matrix, schedule the jobs and execute or submit them.
    Run {
        /// How many invocations of each (benchmark, configuration) pair.
        #[arg(
            short = 'i',
            long,
            default_value_t = 20,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        invocations: u64,

        /// Parent directory for the run's working directory.
        ///
        /// Overrides `[driver].logdir` from the matrix file.
        #[arg(long, value_name = "DIR")]
        logdir: Option<PathBuf>,
    },

    /// Regroup recorded output under DIR and feed it through the pipelines.
    Analyse {
        /// Run directory containing a MANIFEST.
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Report which manifest entries have produced output so far.
    Status {
        /// Run directory containing a MANIFEST.
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
