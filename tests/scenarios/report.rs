//! Test: Report - excerpts, hints and rendering of a finished run

use crate::common::*;
use quality_gate::core::config::ClassifierRule;
use quality_gate::core::{FailurePolicy, Pipeline};
use quality_gate::report::{Classifier, RuleClassifier};
use quality_gate::{summarize, summarize_with, ReportOptions};

const MYPY_OUTPUT: &[&str] = &[
    "src/app.py:3: error: Missing return statement  [return]",
    "src/app.py:9: error: Incompatible types in assignment  [assignment]",
    "src/db.py:1: error: Library stubs not installed for \"requests\"  [import-untyped]",
    "Found 3 errors in 2 files (checked 4 source files)",
];

async fn failed_type_check() -> quality_gate::PipelineRun {
    let pipeline = Pipeline::new("python", python_steps()).unwrap();
    let invoker = ScriptedInvoker::new().on("mypy", Script::Fail(1, MYPY_OUTPUT.to_vec()));
    run_pipeline(&pipeline, invoker, FailurePolicy::FailFast).await
}

/// Test that the rendered report shows every step and the failure excerpt
#[tokio::test]
async fn test_render_failed_run() {
    let run = failed_type_check().await;
    let text = summarize(&run, &ReportOptions::default()).render();

    assert!(text.starts_with("Quality gate: python"));
    assert!(text.contains("Scope: src"));
    assert!(text.contains("✓ black"));
    assert!(text.contains("✗ mypy"));
    assert!(text.contains("- pytest"));
    assert!(text.contains("      src/app.py:3: error: Missing return statement  [return]"));
    assert!(text.contains("Result: FAILED (2 passed, 1 failed, 1 skipped)"));
    assert!(!text.contains("Run cancelled"));
}

/// Test that long output is cut to the configured excerpt
#[tokio::test]
async fn test_excerpt_is_truncated() {
    let run = failed_type_check().await;
    let report = summarize(&run, &ReportOptions { excerpt_lines: 1 });

    let mypy = report.failed_steps().next().unwrap();
    assert_eq!(mypy.excerpt.len(), 1);
    assert_eq!(mypy.omitted_lines, 3);
    assert!(report.render().contains("... 3 more lines"));
}

/// Test that classifier rules attach suggested fixes to failed steps
#[tokio::test]
async fn test_classifier_hints() {
    let run = failed_type_check().await;
    let classifier = RuleClassifier::from_rules(&[
        ClassifierRule {
            pattern: r#"Library stubs not installed for "(\w+)""#.into(),
            suggestion: "install the types- package for the library".into(),
        },
        ClassifierRule {
            pattern: r"\[return\]$".into(),
            suggestion: "add a return statement on every path".into(),
        },
    ])
    .unwrap();

    let report = summarize_with(&run, &ReportOptions::default(), Some(&classifier as &dyn Classifier));

    let mypy = report.failed_steps().next().unwrap();
    let fixes: Vec<_> = mypy.findings.iter().map(|f| f.suggested_fix.as_str()).collect();
    assert_eq!(
        fixes,
        vec![
            "add a return statement on every path",
            "install the types- package for the library"
        ]
    );
    assert!(report.steps[0].findings.is_empty());
    assert!(report.render().contains("hint: add a return statement on every path"));
}

/// Test that the JSON form carries the step outcomes
#[tokio::test]
async fn test_json_report() {
    let run = failed_type_check().await;
    let json = summarize(&run, &ReportOptions::default()).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["status"], "failed");
    assert_eq!(value["pipeline_name"], "python");
    assert_eq!(value["steps"][2]["name"], "mypy");
    assert_eq!(value["steps"][2]["failure"], "check");
    assert_eq!(value["steps"][3]["status"], "skipped");
    assert_eq!(value["skipped"], 1);
}
