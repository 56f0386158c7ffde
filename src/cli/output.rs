//! CLI output formatting

use crate::{
    core::{FailureKind, OverallStatus, StepResult, StepStatus},
    execution::ExecutionEvent,
    persistence::RunRecord,
    report::{format_duration, Report},
};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format an overall status for display
pub fn format_status(status: OverallStatus) -> String {
    match status {
        OverallStatus::Succeeded => style("PASSED").green().to_string(),
        OverallStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// One-line summary of a finished step
pub fn format_step_result(result: &StepResult) -> String {
    match result.status {
        StepStatus::Succeeded => format!(
            "{} {} {}",
            CHECK,
            style(&result.step_name).green(),
            style(format_duration(result.duration_ms)).dim()
        ),
        StepStatus::Skipped => format!("{} {}", SKIP, style(&result.step_name).dim()),
        StepStatus::Failed => {
            let icon = match result.failure {
                Some(FailureKind::Invocation) | Some(FailureKind::Timeout) => &WARN,
                _ => &CROSS,
            };
            let optional = if result.required { "" } else { " (optional)" };
            format!(
                "{} {}{} {}: {}",
                icon,
                style(&result.step_name).red(),
                optional,
                style(format_duration(result.duration_ms)).dim(),
                style(result.error_summary.as_deref().unwrap_or("failed")).dim()
            )
        }
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name,
            total_steps,
        } => format!(
            "{} Running {} ({} steps, {})",
            ROCKET,
            style(pipeline_name).bold(),
            total_steps,
            style(&run_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::SetupStarted { step_name, command } => format!(
            "{} setup {} {}",
            SPINNER,
            style(step_name).cyan(),
            style(command).dim()
        ),
        ExecutionEvent::StepStarted {
            step_name,
            index,
            total,
            command,
        } => format!(
            "{} [{}/{}] {} {}",
            SPINNER,
            index + 1,
            total,
            style(step_name).cyan(),
            style(command).dim()
        ),
        ExecutionEvent::StepOutput {
            step_name, line, ..
        } => format!("  {} {}", style(format!("{} │", step_name)).dim(), line),
        ExecutionEvent::SetupFinished { result } | ExecutionEvent::StepFinished { result, .. } => {
            format_step_result(result)
        }
        ExecutionEvent::StepSkipped { step_name, reason } => format!(
            "{} {} {}",
            SKIP,
            style(step_name).dim(),
            style(format!("({})", reason)).dim()
        ),
        ExecutionEvent::PipelineCancelled { .. } => {
            format!("{} {}", WARN, style("Cancelled, remaining steps skipped").yellow())
        }
        ExecutionEvent::PipelineFinished {
            status,
            passed,
            failed,
            skipped,
            ..
        } => format!(
            "{} {} ({} passed, {} failed, {} skipped)",
            INFO,
            format_status(*status),
            style(passed).green(),
            style(failed).red(),
            style(skipped).dim()
        ),
    }
}

/// Format a stored run for history listings
pub fn format_run_record(record: &RunRecord) -> String {
    let icon = match record.status {
        OverallStatus::Succeeded => &CHECK,
        OverallStatus::Failed if record.cancelled => &WARN,
        OverallStatus::Failed => &CROSS,
    };
    let coverage = record
        .coverage
        .map(|c| format!(" - coverage {:.1}%", c))
        .unwrap_or_default();

    format!(
        "{} {} - {} - {} - {} ({} passed, {} failed, {} skipped){}",
        icon,
        style(&record.run_id.to_string()[..8]).dim(),
        style(record.started_at.format("%Y-%m-%d %H:%M:%S")).dim(),
        style(&record.pipeline_name).bold(),
        format_status(record.status),
        record.passed,
        record.failed,
        record.skipped,
        coverage
    )
}

/// Final verdict line printed after the report
pub fn format_verdict(report: &Report) -> String {
    match report.status {
        OverallStatus::Succeeded => format!(
            "{} {} passed",
            CHECK,
            style(&report.pipeline_name).bold()
        ),
        OverallStatus::Failed if report.cancelled => format!(
            "{} {} {}",
            WARN,
            style(&report.pipeline_name).bold(),
            style("cancelled").yellow()
        ),
        OverallStatus::Failed => format!(
            "{} {} {}",
            CROSS,
            style(&report.pipeline_name).bold(),
            style("failed").red()
        ),
    }
}

/// Horizontal rule sized to the terminal
pub fn separator() -> String {
    let width = term_size::dimensions_stdout()
        .map(|(w, _)| w)
        .unwrap_or(80);
    "─".repeat(width.min(120))
}
