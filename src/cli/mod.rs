//! Command-line interface

pub mod commands;
pub mod output;
pub mod progress;

use crate::core::{OverallStatus, PipelineRun, RunMode};
use crate::report::CoverageCheck;
use clap::{Parser, Subcommand};
use commands::{HistoryCommand, ListCommand, RunCommand, RunModeArg, ValidateCommand};
use std::ffi::OsString;

/// Process exit codes
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// A required step reported problems, or coverage dropped with `fail_on_drop`
    pub const CHECK_FAILURE: i32 = 1;
    /// A required step's tool could not be started
    pub const INVOCATION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    /// I/O or history store failure
    pub const INTERNAL_ERROR: i32 = 4;
    pub const CANCELLED: i32 = 130;
}

/// Quality gate runner for formatters, linters, type checkers and tests
#[derive(Debug, Parser, Clone)]
#[command(name = "qgate")]
#[command(version)]
#[command(about = "Run formatters, linters, type checkers and tests as a fail-fast quality gate", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Stream tool output while steps run
    #[arg(short, long, global = true)]
    pub stream: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the quality gate
    Run(RunCommand),

    /// Validate a gate configuration
    Validate(ValidateCommand),

    /// List pipelines in history
    List(ListCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Whether logging should run at DEBUG
    pub fn debug_logging(&self) -> bool {
        self.verbose || matches!(&self.command, Command::Run(cmd) if cmd.mode == RunModeArg::Debug)
    }

    /// Whether tool output should be shown live
    pub fn streams_output(&self, mode: RunMode) -> bool {
        self.stream || mode.streams_output()
    }
}

/// Exit code for a finished run
pub fn run_exit_code(run: &PipelineRun, coverage: Option<&CoverageCheck>) -> i32 {
    if run.cancelled {
        exit_code::CANCELLED
    } else if run.has_required_invocation_error() {
        exit_code::INVOCATION_ERROR
    } else if run.overall_status() == OverallStatus::Failed
        || coverage.is_some_and(CoverageCheck::fails_gate)
    {
        exit_code::CHECK_FAILURE
    } else {
        exit_code::SUCCESS
    }
}
