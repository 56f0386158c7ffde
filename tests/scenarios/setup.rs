//! Test: Setup - dependency steps run before the checks

use crate::common::*;
use quality_gate::core::{FailurePolicy, OverallStatus, Pipeline, StepKind, StepStatus};
use quality_gate::{summarize, ReportOptions};

fn with_setup() -> Pipeline {
    Pipeline::new("python", python_steps())
        .unwrap()
        .with_setup(vec![step("pip", StepKind::Custom).without_paths()])
        .unwrap()
}

/// Test that setup runs first and checks follow
#[tokio::test]
async fn test_setup_runs_before_checks() {
    let invoker = ScriptedInvoker::new().on("pip", Script::Pass(vec!["Successfully installed"]));
    let log = invoker.log();

    let run = run_pipeline(&with_setup(), invoker, FailurePolicy::FailFast).await;

    assert_eq!(log.programs(), vec!["pip", "black", "flake8", "mypy", "pytest"]);
    assert!(log.commands()[0].args.is_empty());
    assert_eq!(run.setup_results().len(), 1);
    assert_eq!(run.overall_status(), OverallStatus::Succeeded);
}

/// Test that a failed install skips every check, whatever the policy
#[tokio::test]
async fn test_setup_failure_skips_all_checks() {
    for policy in [FailurePolicy::FailFast, FailurePolicy::ContinueOnFailure] {
        let invoker = ScriptedInvoker::new().on(
            "pip",
            Script::Fail(1, vec!["ERROR: No matching distribution found for nosuchpkg"]),
        );
        let log = invoker.log();

        let run = run_pipeline(&with_setup(), invoker, policy).await;

        assert_eq!(log.programs(), vec!["pip"]);
        assert!(run.setup_failed());
        assert_eq!(run.skipped(), 4);
        assert!(run.results().iter().all(|r| r.status == StepStatus::Skipped));
        assert_eq!(run.overall_status(), OverallStatus::Failed);

        let report = summarize(&run, &ReportOptions::default());
        assert_eq!(report.setup[0].status, StepStatus::Failed);
        assert!(report.render().contains("Setup:"));
    }
}
