//! quality-gate - run formatters, linters, type checkers and tests as one
//! ordered, fail-fast gate

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod report;
pub mod runner;

// Re-export commonly used types
pub use core::config::GateConfig;
pub use core::{
    ConfigError, ExecutionOptions, FailureKind, FailurePolicy, OverallStatus, Pipeline,
    PipelineRun, RunMode, Scope, Step, StepKind, StepResult, StepStatus,
};
pub use execution::{CancelHandle, CancelSignal, ExecutionEngine, ExecutionEvent, SchedulingStrategy};
pub use report::{summarize, summarize_with, Report, ReportOptions};
pub use runner::{InvokeError, OutputCallback, OutputStream, ProcessInvoker, ToolExit, ToolInvoker};
