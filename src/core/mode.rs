//! Failure policies and run modes

use serde::{Deserialize, Serialize};

/// What happens after a required step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first required failure; later steps are skipped
    #[default]
    FailFast,
    /// Run every step regardless of earlier outcomes
    ContinueOnFailure,
}

/// User-facing run mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Full diagnostic sweep, nothing is rewritten
    AnalyzeOnly,
    /// Apply fixes (formatters rewrite files), then validate
    FullCleanup,
    /// Check-only, stop at the first required failure
    #[default]
    Ci,
    /// Like analyze-only, with streamed tool output and debug logging
    Debug,
}

/// Options the engine needs for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub policy: FailurePolicy,
    pub apply_fixes: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        RunMode::default().execution_options()
    }
}

impl RunMode {
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            RunMode::AnalyzeOnly | RunMode::Debug => FailurePolicy::ContinueOnFailure,
            RunMode::FullCleanup | RunMode::Ci => FailurePolicy::FailFast,
        }
    }

    pub fn applies_fixes(&self) -> bool {
        matches!(self, RunMode::FullCleanup)
    }

    pub fn streams_output(&self) -> bool {
        matches!(self, RunMode::Debug)
    }

    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            policy: self.failure_policy(),
            apply_fixes: self.applies_fixes(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunMode::AnalyzeOnly => "analyze-only",
            RunMode::FullCleanup => "full-cleanup",
            RunMode::Ci => "ci",
            RunMode::Debug => "debug",
        }
    }
}
