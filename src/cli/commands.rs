//! CLI command definitions

use crate::core::config::BuiltinPreset;
use crate::core::RunMode;
use crate::execution::SchedulingStrategy;
use clap::Args;
use std::path::PathBuf;

/// Concurrency used by `--strategy parallel-limited`
pub const LIMITED_PARALLELISM: usize = 4;

/// Run the quality gate
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to check, or `all` for the configured scope
    pub scope: Option<String>,

    /// Path to gate YAML file (defaults to quality-gate.yaml)
    #[arg(short, long, conflicts_with = "preset")]
    pub file: Option<PathBuf>,

    /// Use a built-in pipeline instead of a file
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Run mode
    #[arg(short, long, value_enum, default_value_t = RunModeArg::Ci)]
    pub mode: RunModeArg,

    /// Scheduling strategy
    #[arg(long, value_enum, default_value_t = SchedulingStrategyArg::Sequential)]
    pub strategy: SchedulingStrategyArg,

    /// Output lines shown per failed step (overrides the config)
    #[arg(long)]
    pub excerpt_lines: Option<usize>,

    /// Variable overrides (key=value)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub variables: Vec<(String, String)>,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Validate a gate configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to gate YAML file (defaults to quality-gate.yaml)
    #[arg(short, long, conflicts_with = "preset")]
    pub file: Option<PathBuf>,

    /// Validate a built-in pipeline
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List pipelines seen in history
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Show run counts
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show the full report of one run
    #[arg(long)]
    pub run_id: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run mode argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunModeArg {
    AnalyzeOnly,
    FullCleanup,
    Ci,
    Debug,
}

impl From<RunModeArg> for RunMode {
    fn from(arg: RunModeArg) -> Self {
        match arg {
            RunModeArg::AnalyzeOnly => RunMode::AnalyzeOnly,
            RunModeArg::FullCleanup => RunMode::FullCleanup,
            RunModeArg::Ci => RunMode::Ci,
            RunModeArg::Debug => RunMode::Debug,
        }
    }
}

/// Built-in pipeline argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PresetArg {
    Python,
    Rust,
}

impl From<PresetArg> for BuiltinPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Python => BuiltinPreset::Python,
            PresetArg::Rust => BuiltinPreset::Rust,
        }
    }
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}

impl From<SchedulingStrategyArg> for SchedulingStrategy {
    fn from(arg: SchedulingStrategyArg) -> Self {
        match arg {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => {
                SchedulingStrategy::LimitedParallel(LIMITED_PARALLELISM)
            }
        }
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
