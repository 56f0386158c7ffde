//! Test: From Config - YAML gate definitions drive the engine

use crate::common::*;
use quality_gate::core::config::{BuiltinPreset, GateConfig};
use quality_gate::core::{ConfigError, FailurePolicy, RunMode, StepStatus};
use quality_gate::execution::{ExecutionEngine, SchedulingStrategy, CancelSignal};

const GATE: &str = r#"
name: "service"
variables:
  python: "python3.12"
defaults:
  timeout_secs: 120
setup:
  - name: "install"
    command: ["{{ python }}", "-m", "pip", "install", "-e", "."]
    pass_paths: false
steps:
  - name: "format"
    kind: format
    command: ["{{ python }}", "-m", "black", "--check", "{{ paths }}"]
    fix_command: ["{{ python }}", "-m", "black", "{{ paths }}"]
  - name: "lint"
    kind: lint
    command: ["{{ python }}", "-m", "flake8"]
    parallel: true
  - name: "types"
    kind: type_check
    command: ["{{ python }}", "-m", "mypy"]
    parallel: true
  - name: "test"
    kind: test
    command: ["{{ python }}", "-m", "pytest"]
    pass_paths: false
    env:
      API_TOKEN: "{{ token }}"
"#;

/// Test that a gate needs every variable its commands use
#[test]
fn test_undefined_variable_is_config_error() {
    let err = GateConfig::from_yaml(GATE).unwrap_err();
    assert!(matches!(err, ConfigError::UndefinedVariable { ref variable, .. } if variable == "token"));
}

/// Test a configured gate end to end under full cleanup mode
#[tokio::test]
async fn test_configured_gate_full_cleanup() {
    let mut config = GateConfig::parse_yaml(GATE).unwrap();
    config.set_variable("token", "s3cret");
    config.validate().unwrap();
    let pipeline = config.to_pipeline().unwrap();

    let invoker = ScriptedInvoker::new();
    let log = invoker.log();
    let run = ExecutionEngine::new(invoker, SchedulingStrategy::Parallel)
        .execute(
            &pipeline,
            &scope(),
            &RunMode::FullCleanup.execution_options(),
            &CancelSignal::never(),
        )
        .await;

    assert_eq!(run.policy, FailurePolicy::FailFast);
    assert!(run.results().iter().all(|r| r.status == StepStatus::Succeeded));

    let commands = log.commands();
    assert_eq!(commands.len(), 5);
    assert!(commands.iter().all(|c| c.program == "python3.12"));
    assert_eq!(commands[0].args, vec!["-m", "pip", "install", "-e", "."]);
    assert_eq!(commands[1].args, vec!["-m", "black", "src"]);
    let test = commands.iter().find(|c| c.args.contains(&"pytest".to_string())).unwrap();
    assert_eq!(test.args, vec!["-m", "pytest"]);
    assert_eq!(test.env.get("API_TOKEN").map(String::as_str), Some("s3cret"));
}

/// Test that the built-in presets validate and keep their step order
#[test]
fn test_presets() {
    let python = GateConfig::preset(BuiltinPreset::Python).unwrap();
    let names: Vec<_> = python.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["format", "imports", "lint", "type-check", "test"]);

    let rust = GateConfig::preset(BuiltinPreset::Rust).unwrap().to_pipeline().unwrap();
    assert_eq!(rust.len(), 3);
    assert!(rust.steps().iter().all(|s| !s.pass_paths));
}
