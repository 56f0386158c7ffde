//! Test: Continue On Failure - every step runs and every failure is reported

use crate::common::*;
use quality_gate::core::{FailurePolicy, OverallStatus, Pipeline, StepStatus};
use quality_gate::{summarize, ReportOptions};

/// Test that later steps still run after a required failure
#[tokio::test]
async fn test_all_steps_run_after_failure() {
    let pipeline = Pipeline::new("python", python_steps()).unwrap();
    let invoker = ScriptedInvoker::new()
        .on("flake8", Script::Fail(1, vec!["src/app.py:1:1: F401 'os' imported but unused"]))
        .on("pytest", Script::Fail(1, vec!["FAILED tests/test_app.py::test_total", "1 failed, 9 passed"]));
    let log = invoker.log();

    let run = run_pipeline(&pipeline, invoker, FailurePolicy::ContinueOnFailure).await;

    assert_statuses(
        &run,
        &[
            ("black", StepStatus::Succeeded),
            ("flake8", StepStatus::Failed),
            ("mypy", StepStatus::Succeeded),
            ("pytest", StepStatus::Failed),
        ],
    );
    assert_eq!(log.programs().len(), 4);
    assert_eq!(run.overall_status(), OverallStatus::Failed);
    assert_eq!(run.skipped(), 0);

    let report = summarize(&run, &ReportOptions::default());
    let failed: Vec<_> = report.failed_steps().map(|s| s.name.as_str()).collect();
    assert_eq!(failed, vec!["flake8", "pytest"]);
    assert_eq!(
        report.steps[3].error_summary.as_deref(),
        Some("1 failed, 9 passed")
    );
}

/// Test that only optional failures leave the run successful
#[tokio::test]
async fn test_only_optional_failures_succeed() {
    let mut steps = python_steps();
    steps[1] = steps[1].clone().optional();
    let pipeline = Pipeline::new("python", steps).unwrap();
    let invoker = ScriptedInvoker::new().on("flake8", Script::Fail(1, vec!["W291 trailing whitespace"]));

    let run = run_pipeline(&pipeline, invoker, FailurePolicy::ContinueOnFailure).await;

    assert_eq!(run.failed(), 1);
    assert_eq!(run.overall_status(), OverallStatus::Succeeded);
}

/// type-check fails, the test suite still runs and passes, the gate fails
#[tokio::test]
async fn test_type_check_failure_still_runs_tests() {
    let pipeline = Pipeline::new("python", python_steps()).unwrap();
    let invoker = ScriptedInvoker::new()
        .on("mypy", Script::Fail(1, vec!["src/app.py:3: error: Missing return statement", "Found 1 error in 1 file"]))
        .on("pytest", Script::Pass(vec!["12 passed in 0.41s"]));
    let log = invoker.log();

    let run = run_pipeline(&pipeline, invoker, FailurePolicy::ContinueOnFailure).await;

    assert!(log.was_called("pytest"));
    assert_step_status(&run, "mypy", StepStatus::Failed);
    assert_step_status(&run, "pytest", StepStatus::Succeeded);
    assert_eq!(run.overall_status(), OverallStatus::Failed);
}
