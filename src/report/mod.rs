//! Report aggregation: a read-only projection of a finished run

pub mod classify;
pub mod coverage;

pub use classify::{Classifier, Finding, RuleClassifier};
pub use coverage::{CoverageCheck, CoverageProbe};

use crate::core::{FailureKind, OverallStatus, PipelineRun, StepKind, StepResult, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

pub const GLYPH_PASSED: &str = "✓";
pub const GLYPH_FAILED: &str = "✗";
pub const GLYPH_SKIPPED: &str = "-";

/// Options controlling report size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Lines of captured output kept for each failed step
    pub excerpt_lines: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { excerpt_lines: 20 }
    }
}

/// One step as shown in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLine {
    pub name: String,
    pub kind: StepKind,
    pub glyph: String,
    pub status: StepStatus,
    pub failure: Option<FailureKind>,
    pub required: bool,
    pub duration_ms: u64,
    pub exit_code: Option<i32>,
    pub error_summary: Option<String>,
    /// First lines of output, failed steps only
    pub excerpt: Vec<String>,
    pub omitted_lines: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub run_id: Uuid,
    pub pipeline_name: String,
    pub status: OverallStatus,
    pub cancelled: bool,
    pub scope: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub setup: Vec<StepLine>,
    pub steps: Vec<StepLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageCheck>,
}

fn glyph(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Succeeded => GLYPH_PASSED,
        StepStatus::Failed => GLYPH_FAILED,
        StepStatus::Skipped => GLYPH_SKIPPED,
    }
}

fn step_line(
    result: &StepResult,
    options: &ReportOptions,
    classifier: Option<&dyn Classifier>,
) -> StepLine {
    let (excerpt, omitted_lines, findings) = if result.is_failure() {
        let excerpt: Vec<String> = result
            .captured_output
            .iter()
            .take(options.excerpt_lines)
            .cloned()
            .collect();
        let omitted = result.captured_output.len() - excerpt.len();
        let findings = classifier
            .map(|c| c.classify(&result.captured_output))
            .unwrap_or_default();
        (excerpt, omitted, findings)
    } else {
        (Vec::new(), 0, Vec::new())
    };

    StepLine {
        name: result.step_name.clone(),
        kind: result.kind,
        glyph: glyph(result.status).to_string(),
        status: result.status,
        failure: result.failure,
        required: result.required,
        duration_ms: result.duration_ms,
        exit_code: result.exit_code,
        error_summary: result.error_summary.clone(),
        excerpt,
        omitted_lines,
        findings,
    }
}

/// Build the report for a run without diagnostic classification
pub fn summarize(run: &PipelineRun, options: &ReportOptions) -> Report {
    summarize_with(run, options, None)
}

/// Build the report, attaching classifier findings to failed steps
pub fn summarize_with(
    run: &PipelineRun,
    options: &ReportOptions,
    classifier: Option<&dyn Classifier>,
) -> Report {
    Report {
        run_id: run.run_id,
        pipeline_name: run.pipeline_name.clone(),
        status: run.overall_status(),
        cancelled: run.cancelled,
        scope: run.scope.clone(),
        started_at: run.started_at,
        finished_at: run.finished_at,
        duration_ms: run.duration_ms(),
        passed: run.passed(),
        failed: run.failed(),
        skipped: run.skipped(),
        setup: run
            .setup_results()
            .iter()
            .map(|r| step_line(r, options, classifier))
            .collect(),
        steps: run
            .results()
            .iter()
            .map(|r| step_line(r, options, classifier))
            .collect(),
        coverage: None,
    }
}

/// Human-friendly duration
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

impl Report {
    pub fn with_coverage(mut self, check: Option<CoverageCheck>) -> Self {
        self.coverage = check;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OverallStatus::Succeeded
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepLine> {
        self.steps.iter().filter(|s| s.status == StepStatus::Failed)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text rendering, one line per step plus failure excerpts
    pub fn render(&self) -> String {
        let mut out = String::new();
        let width = self
            .setup
            .iter()
            .chain(self.steps.iter())
            .map(|s| s.name.chars().count())
            .max()
            .unwrap_or(0);

        let _ = writeln!(out, "Quality gate: {} ({})", self.pipeline_name, self.run_id);
        if !self.scope.is_empty() {
            let _ = writeln!(out, "Scope: {}", self.scope.join(" "));
        }

        if !self.setup.is_empty() {
            let _ = writeln!(out, "\nSetup:");
            for line in &self.setup {
                render_step(&mut out, line, width);
            }
        }

        let _ = writeln!(out, "\nSteps:");
        for line in &self.steps {
            render_step(&mut out, line, width);
        }

        if let Some(coverage) = &self.coverage {
            let _ = write!(out, "\nCoverage: {:.1}%", coverage.current);
            match coverage.baseline {
                Some(baseline) => {
                    let _ = write!(
                        out,
                        " (baseline {:.1}%, tolerance {:.1})",
                        baseline, coverage.tolerance
                    );
                }
                None => {
                    let _ = write!(out, " (no baseline)");
                }
            }
            if coverage.regressed {
                let _ = write!(out, " REGRESSED");
            }
            out.push('\n');
        }

        if self.cancelled {
            let _ = writeln!(out, "\nRun cancelled");
        }

        let verdict = match self.status {
            OverallStatus::Succeeded => "PASSED",
            OverallStatus::Failed => "FAILED",
        };
        let _ = writeln!(
            out,
            "\nResult: {} ({} passed, {} failed, {} skipped) in {}",
            verdict,
            self.passed,
            self.failed,
            self.skipped,
            format_duration(self.duration_ms)
        );

        out
    }
}

fn render_step(out: &mut String, line: &StepLine, width: usize) {
    let timing = match line.status {
        StepStatus::Skipped => "skipped".to_string(),
        _ => format_duration(line.duration_ms),
    };
    let _ = write!(out, "  {} {:<width$}  {}", line.glyph, line.name, timing, width = width);
    if !line.required {
        let _ = write!(out, "  (optional)");
    }
    if let Some(summary) = &line.error_summary {
        let _ = write!(out, "  {}", summary);
    }
    out.push('\n');

    for excerpt in &line.excerpt {
        let _ = writeln!(out, "      {}", excerpt);
    }
    if line.omitted_lines > 0 {
        let _ = writeln!(out, "      ... {} more lines", line.omitted_lines);
    }
    for finding in &line.findings {
        let _ = writeln!(out, "      hint: {} ({})", finding.suggested_fix, finding.line);
    }
}
