//! Step executor - runs individual steps through a tool invoker

use crate::{
    core::{ExecutionOptions, FailureKind, Scope, Step, StepResult, INVOCATION_ERROR},
    execution::CancelSignal,
    runner::{CapturedOutput, OutputCallback, ToolExit, ToolInvoker},
};
use chrono::Utc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

/// Longest failure summary taken from tool output
const SUMMARY_MAX_CHARS: usize = 200;

enum Interruption {
    TimedOut,
    Cancelled,
}

/// Executes a single step
pub struct StepExecutor<I> {
    invoker: I,
}

impl<I: ToolInvoker> StepExecutor<I> {
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Execute a step and return its result
    ///
    /// Never fails: tool problems, timeouts and cancellation all become a
    /// failed [`StepResult`] so the engine can keep going.
    pub async fn execute(
        &self,
        step: &Step,
        scope: &Scope,
        options: &ExecutionOptions,
        cancel: &CancelSignal,
        output: Option<&dyn OutputCallback>,
    ) -> StepResult {
        info!("Executing step: {}", step.name);

        let command = step.invocation(scope, options.apply_fixes);
        debug!("Command for step {}: {}", step.name, command.display());

        let capture = CapturedOutput::new(command.secret_values(), output);
        let started_at = Utc::now();
        let clock = Instant::now();

        let outcome = {
            let invocation = self.invoker.invoke(&command, &capture);
            let bounded = async {
                if step.timeout_secs > 0 {
                    timeout(Duration::from_secs(step.timeout_secs), invocation)
                        .await
                        .map_err(|_| Interruption::TimedOut)
                } else {
                    Ok(invocation.await)
                }
            };
            tokio::select! {
                result = bounded => result,
                _ = cancel.cancelled() => Err(Interruption::Cancelled),
            }
        };

        let duration_ms = clock.elapsed().as_millis() as u64;
        let mut lines = capture.into_lines();

        match outcome {
            Ok(Ok(ToolExit { success: true, .. })) => {
                info!("Step {} passed in {}ms", step.name, duration_ms);
                StepResult::succeeded(&step.name, step.kind, step.required, started_at, duration_ms, lines)
            }
            Ok(Ok(exit)) => {
                let summary = failure_summary(&lines, exit.code);
                warn!("Step {} failed: {}", step.name, summary);
                StepResult::failed(
                    &step.name,
                    step.kind,
                    step.required,
                    FailureKind::Check,
                    exit.code,
                    started_at,
                    duration_ms,
                    lines,
                    summary,
                )
            }
            Ok(Err(e)) => {
                error!("Could not run step {}: {}", step.name, e);
                lines.push(e.to_string());
                StepResult::failed(
                    &step.name,
                    step.kind,
                    step.required,
                    FailureKind::Invocation,
                    None,
                    started_at,
                    duration_ms,
                    lines,
                    INVOCATION_ERROR,
                )
            }
            Err(Interruption::TimedOut) => {
                error!("Timeout for step {} after {}s", step.name, step.timeout_secs);
                StepResult::failed(
                    &step.name,
                    step.kind,
                    step.required,
                    FailureKind::Timeout,
                    None,
                    started_at,
                    duration_ms,
                    lines,
                    format!("timed out after {} seconds", step.timeout_secs),
                )
            }
            Err(Interruption::Cancelled) => {
                info!("Step {} cancelled", step.name);
                StepResult::failed(
                    &step.name,
                    step.kind,
                    step.required,
                    FailureKind::Cancelled,
                    None,
                    started_at,
                    duration_ms,
                    lines,
                    "cancelled",
                )
            }
        }
    }
}

/// Last non-empty output line, or the exit status when the tool was silent
pub fn failure_summary(lines: &[String], code: Option<i32>) -> String {
    match lines.iter().rev().map(|l| l.trim()).find(|l| !l.is_empty()) {
        Some(line) => line.chars().take(SUMMARY_MAX_CHARS).collect(),
        None => match code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        },
    }
}
