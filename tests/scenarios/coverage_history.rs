//! Test: Coverage History - coverage is compared against the last good run

use crate::common::*;
use quality_gate::cli::{exit_code, run_exit_code};
use quality_gate::core::config::CoverageConfig;
use quality_gate::core::{FailurePolicy, OverallStatus, Pipeline, PipelineRun, Scope};
use quality_gate::execution::{CancelSignal, ExecutionEngine, SchedulingStrategy};
use std::path::PathBuf;
use quality_gate::persistence::{create_record, InMemoryPersistence, PersistenceBackend};
use quality_gate::report::CoverageProbe;
use quality_gate::{summarize, ReportOptions};

fn probe(fail_on_drop: bool) -> CoverageProbe {
    CoverageProbe::from_config(&CoverageConfig {
        step: "pytest".into(),
        pattern: quality_gate::core::config::DEFAULT_COVERAGE_PATTERN.into(),
        tolerance: 1.0,
        fail_on_drop,
    })
    .unwrap()
}

async fn run_with_coverage(total: &'static str) -> PipelineRun {
    let pipeline = Pipeline::new("python", python_steps()).unwrap();
    let invoker = ScriptedInvoker::new().on(
        "pytest",
        Script::Pass(vec!["Name    Stmts   Miss  Cover", total, "12 passed in 0.41s"]),
    );
    run_pipeline(&pipeline, invoker, FailurePolicy::FailFast).await
}

/// Test that a drop beyond the tolerance is flagged against the stored baseline
#[tokio::test]
async fn test_coverage_regression_against_history() {
    let store = InMemoryPersistence::new();
    let probe = probe(false);

    let first = run_with_coverage("TOTAL     200     30    85%").await;
    let measured = probe.measure(&first);
    assert_eq!(measured, Some(85.0));
    assert_eq!(store.coverage_baseline("python", &first.scope).await.unwrap(), None);
    store.save_run(&create_record(&first, measured)).await.unwrap();

    let second = run_with_coverage("TOTAL     200     40    80%").await;
    let current = probe.measure(&second).unwrap();
    let baseline = store.coverage_baseline("python", &second.scope).await.unwrap();
    let check = probe.compare(current, baseline);

    assert_eq!(check.baseline, Some(85.0));
    assert!(check.regressed);
    assert!(!check.fails_gate());
    assert_eq!(second.overall_status(), OverallStatus::Succeeded);
    assert_eq!(run_exit_code(&second, Some(&check)), exit_code::SUCCESS);

    let text = summarize(&second, &ReportOptions::default())
        .with_coverage(Some(check))
        .render();
    assert!(text.contains("Coverage: 80.0% (baseline 85.0%, tolerance 1.0) REGRESSED"));
}

/// Test that `fail_on_drop` turns a regression into a gate failure
#[tokio::test]
async fn test_fail_on_drop() {
    let probe = probe(true);
    let run = run_with_coverage("TOTAL     200     40    80%").await;

    let check = probe.compare(probe.measure(&run).unwrap(), Some(85.0));
    assert!(check.fails_gate());
    assert_eq!(run_exit_code(&run, Some(&check)), exit_code::CHECK_FAILURE);

    let within = probe.compare(84.5, Some(85.0));
    assert!(!within.regressed);
}

/// Test that a run whose test step was skipped measures nothing
#[tokio::test]
async fn test_skipped_test_step_has_no_coverage() {
    let pipeline = Pipeline::new("python", python_steps()).unwrap();
    let invoker = ScriptedInvoker::new().on("black", Script::Fail(1, vec!["would reformat"]));
    let run = run_pipeline(&pipeline, invoker, FailurePolicy::FailFast).await;

    assert_eq!(probe(true).measure(&run), None);
}

/// Test that a run over part of the tree never shares a baseline with full runs
#[tokio::test]
async fn test_baseline_not_shared_across_scopes() {
    let store = InMemoryPersistence::new();
    let probe = probe(true);

    let full = run_with_coverage("TOTAL     200     30    85%").await;
    store.save_run(&create_record(&full, probe.measure(&full))).await.unwrap();

    let pipeline = Pipeline::new("python", python_steps()).unwrap();
    let invoker = ScriptedInvoker::new().on("pytest", Script::Pass(vec!["TOTAL     40     20    50%"]));
    let scoped = ExecutionEngine::new(invoker, SchedulingStrategy::Sequential)
        .execute(
            &pipeline,
            &Scope::new(".", vec![PathBuf::from("src/pkg")]),
            &options(FailurePolicy::FailFast),
            &CancelSignal::never(),
        )
        .await;

    let baseline = store.coverage_baseline("python", &scoped.scope).await.unwrap();
    assert_eq!(baseline, None);
    let check = probe.compare(probe.measure(&scoped).unwrap(), baseline);
    assert!(!check.regressed);
    assert_eq!(run_exit_code(&scoped, Some(&check)), exit_code::SUCCESS);

    // Storing the partial run leaves the full-scope baseline untouched
    store.save_run(&create_record(&scoped, Some(50.0))).await.unwrap();
    assert_eq!(store.coverage_baseline("python", &full.scope).await.unwrap(), Some(85.0));
}
