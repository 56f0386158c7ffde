//! Execution state models

use crate::core::{mode::FailurePolicy, step::StepKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary recorded for a step whose tool could not be started
pub const INVOCATION_ERROR: &str = "invocation error";

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// Why a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The tool ran and reported problems
    Check,
    /// The tool could not be located or started
    Invocation,
    /// The tool exceeded its timeout and was killed
    Timeout,
    /// The run was interrupted while the tool was running
    Cancelled,
}

/// Overall status of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Succeeded,
    Failed,
}

/// Result of executing (or skipping) one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,

    pub kind: StepKind,

    /// Copied from the step so the run can derive its overall status
    pub required: bool,

    pub status: StepStatus,

    /// Set only when `status` is `Failed`
    pub failure: Option<FailureKind>,

    /// Process exit code, when the process exited normally
    pub exit_code: Option<i32>,

    pub duration_ms: u64,

    /// None for skipped steps
    pub started_at: Option<DateTime<Utc>>,

    /// Combined stdout/stderr lines in arrival order
    pub captured_output: Vec<String>,

    pub error_summary: Option<String>,
}

impl StepResult {
    pub fn succeeded(
        step_name: impl Into<String>,
        kind: StepKind,
        required: bool,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        captured_output: Vec<String>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            kind,
            required,
            status: StepStatus::Succeeded,
            failure: None,
            exit_code: Some(0),
            duration_ms,
            started_at: Some(started_at),
            captured_output,
            error_summary: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn failed(
        step_name: impl Into<String>,
        kind: StepKind,
        required: bool,
        failure: FailureKind,
        exit_code: Option<i32>,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        captured_output: Vec<String>,
        error_summary: impl Into<String>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            kind,
            required,
            status: StepStatus::Failed,
            failure: Some(failure),
            exit_code,
            duration_ms,
            started_at: Some(started_at),
            captured_output,
            error_summary: Some(error_summary.into()),
        }
    }

    pub fn skipped(step_name: impl Into<String>, kind: StepKind, required: bool) -> Self {
        Self {
            step_name: step_name.into(),
            kind,
            required,
            status: StepStatus::Skipped,
            failure: None,
            exit_code: None,
            duration_ms: 0,
            started_at: None,
            captured_output: Vec::new(),
            error_summary: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Succeeded
    }

    pub fn is_failure(&self) -> bool {
        self.status == StepStatus::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.status == StepStatus::Skipped
    }

    pub fn is_invocation_error(&self) -> bool {
        self.failure == Some(FailureKind::Invocation)
    }
}

/// One execution of a pipeline. Results are append-only and kept in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,

    pub pipeline_name: String,

    pub policy: FailurePolicy,

    /// Target paths the run was scoped to
    pub scope: Vec<String>,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    pub cancelled: bool,

    setup_results: Vec<StepResult>,

    results: Vec<StepResult>,
}

impl PipelineRun {
    pub fn begin(pipeline_name: impl Into<String>, policy: FailurePolicy, scope: Vec<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline_name: pipeline_name.into(),
            policy,
            scope,
            started_at: Utc::now(),
            finished_at: None,
            cancelled: false,
            setup_results: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Append the next step result
    pub fn record(&mut self, result: StepResult) {
        debug_assert!(self.finished_at.is_none(), "run already finalized");
        self.results.push(result);
    }

    /// Append a setup (dependency) step result
    pub fn record_setup(&mut self, result: StepResult) {
        debug_assert!(self.finished_at.is_none(), "run already finalized");
        self.setup_results.push(result);
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Finalize the run; further recording is a contract violation
    pub fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn setup_results(&self) -> &[StepResult] {
        &self.setup_results
    }

    pub fn result(&self, step_name: &str) -> Option<&StepResult> {
        self.results.iter().find(|r| r.step_name == step_name)
    }

    pub fn setup_failed(&self) -> bool {
        self.setup_results.iter().any(StepResult::is_failure)
    }

    pub fn overall_status(&self) -> OverallStatus {
        let required_failed = self
            .results
            .iter()
            .any(|r| r.required && r.is_failure());

        if required_failed || self.setup_failed() || self.cancelled {
            OverallStatus::Failed
        } else {
            OverallStatus::Succeeded
        }
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.is_skipped()).count()
    }

    /// Whether a required step failed because its tool could not be started
    pub fn has_required_invocation_error(&self) -> bool {
        self.results
            .iter()
            .chain(self.setup_results.iter())
            .any(|r| r.required && r.is_invocation_error())
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }
}
