//! Test: Cancellation - interrupting a run kills the current tool

use crate::common::*;
use quality_gate::cli::{exit_code, run_exit_code};
use quality_gate::core::{FailureKind, FailurePolicy, OverallStatus, Pipeline, StepStatus};
use quality_gate::execution::{CancelHandle, ExecutionEngine, ExecutionEvent, SchedulingStrategy};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Test that cancelling mid-step fails it and skips the rest
#[tokio::test]
async fn test_cancel_during_step() {
    let pipeline = Pipeline::new("python", python_steps()).unwrap();
    let invoker = ScriptedInvoker::new().on("flake8", Script::Hang);
    let log = invoker.log();

    let events = Arc::new(Mutex::new(Vec::new()));
    let engine = {
        let events = events.clone();
        ExecutionEngine::new(invoker, SchedulingStrategy::Sequential).with_event_handler(move |event| {
            if let ExecutionEvent::PipelineCancelled { .. } = event {
                events.lock().unwrap().push("cancelled");
            }
        })
    };

    let (handle, signal) = CancelHandle::new();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let run = tokio::time::timeout(
        Duration::from_secs(5),
        engine.execute(&pipeline, &scope(), &options(FailurePolicy::FailFast), &signal),
    )
    .await
    .expect("cancelled run should finish promptly");

    assert_statuses(
        &run,
        &[
            ("black", StepStatus::Succeeded),
            ("flake8", StepStatus::Failed),
            ("mypy", StepStatus::Skipped),
            ("pytest", StepStatus::Skipped),
        ],
    );
    assert_eq!(step_result(&run, "flake8").failure, Some(FailureKind::Cancelled));
    assert!(run.cancelled);
    assert_eq!(run.overall_status(), OverallStatus::Failed);
    assert_eq!(run_exit_code(&run, None), exit_code::CANCELLED);
    assert_eq!(log.programs(), vec!["black", "flake8"]);
    assert_eq!(*events.lock().unwrap(), vec!["cancelled"]);
}

/// Test that a run cancelled before it starts invokes nothing
#[tokio::test]
async fn test_cancel_before_start() {
    let pipeline = Pipeline::new("python", python_steps()).unwrap();
    let invoker = ScriptedInvoker::new();
    let log = invoker.log();

    let (handle, signal) = CancelHandle::new();
    handle.cancel();

    let run = ExecutionEngine::new(invoker, SchedulingStrategy::Sequential)
        .execute(&pipeline, &scope(), &options(FailurePolicy::ContinueOnFailure), &signal)
        .await;

    assert!(log.programs().is_empty());
    assert_eq!(run.skipped(), 4);
    assert!(run.cancelled);
    assert_eq!(run_exit_code(&run, None), exit_code::CANCELLED);
}
