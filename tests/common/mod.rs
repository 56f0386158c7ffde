//! Test utilities shared by the scenario tests

#![allow(dead_code)]

use async_trait::async_trait;
use quality_gate::core::{
    CommandSpec, ExecutionOptions, FailurePolicy, Pipeline, PipelineRun, Scope, Step, StepKind,
    StepResult, StepStatus,
};
use quality_gate::execution::{CancelSignal, ExecutionEngine, SchedulingStrategy};
use quality_gate::runner::{InvokeError, OutputCallback, OutputStream, ToolExit, ToolInvoker};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted tool does when invoked
#[derive(Debug, Clone)]
pub enum Script {
    /// Exit 0 after printing the lines
    Pass(Vec<&'static str>),
    /// Exit with the code after printing the lines
    Fail(i32, Vec<&'static str>),
    /// The program cannot be found
    Missing,
    /// Wait, then behave like the inner script
    Slow(u64, Box<Script>),
    /// Print one line and never exit
    Hang,
}

/// Records every invocation and peak concurrency
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<CommandSpec>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl CallLog {
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.program.clone())
            .collect()
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, program: &str) -> bool {
        self.programs().iter().any(|p| p == program)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Tool invoker that replays scripts keyed by program name.
/// Unknown programs pass silently.
#[derive(Clone, Default)]
pub struct ScriptedInvoker {
    scripts: HashMap<String, Script>,
    log: CallLog,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, program: &str, script: Script) -> Self {
        self.scripts.insert(program.to_string(), script);
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl ToolInvoker for ScriptedInvoker {
    async fn invoke(
        &self,
        command: &CommandSpec,
        output: &dyn OutputCallback,
    ) -> Result<ToolExit, InvokeError> {
        self.log.calls.lock().unwrap().push(command.clone());
        let now = self.log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.log.in_flight);

        let mut script = self
            .scripts
            .get(&command.program)
            .cloned()
            .unwrap_or(Script::Pass(vec![]));

        loop {
            match script {
                Script::Slow(ms, inner) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    script = *inner;
                }
                Script::Pass(lines) => {
                    for line in lines {
                        output.on_line(OutputStream::Stdout, line);
                    }
                    return Ok(ToolExit::ok());
                }
                Script::Fail(code, lines) => {
                    for line in lines {
                        output.on_line(OutputStream::Stderr, line);
                    }
                    return Ok(ToolExit::failed(code));
                }
                Script::Missing => {
                    return Err(InvokeError::NotFound {
                        program: command.program.clone(),
                    })
                }
                Script::Hang => {
                    output.on_line(OutputStream::Stdout, "started");
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

/// A step whose program is its own name
pub fn step(name: &str, kind: StepKind) -> Step {
    Step::new(name, kind, CommandSpec::new(name, Vec::<String>::new()))
}

/// The usual format → lint → type-check → test chain
pub fn python_steps() -> Vec<Step> {
    vec![
        step("black", StepKind::Format),
        step("flake8", StepKind::Lint),
        step("mypy", StepKind::TypeCheck),
        step("pytest", StepKind::Test),
    ]
}

pub fn scope() -> Scope {
    Scope::new(".", vec![PathBuf::from("src")])
}

pub fn options(policy: FailurePolicy) -> ExecutionOptions {
    ExecutionOptions {
        policy,
        apply_fixes: false,
    }
}

/// Run a pipeline sequentially with a scripted invoker
pub async fn run_pipeline(
    pipeline: &Pipeline,
    invoker: ScriptedInvoker,
    policy: FailurePolicy,
) -> PipelineRun {
    ExecutionEngine::new(invoker, SchedulingStrategy::Sequential)
        .execute(pipeline, &scope(), &options(policy), &CancelSignal::never())
        .await
}

pub fn statuses(run: &PipelineRun) -> Vec<(String, StepStatus)> {
    run.results()
        .iter()
        .map(|r| (r.step_name.clone(), r.status))
        .collect()
}

pub fn step_result<'a>(run: &'a PipelineRun, name: &str) -> &'a StepResult {
    run.result(name)
        .unwrap_or_else(|| panic!("Step '{}' not found in run: {:?}", name, statuses(run)))
}

/// Assert a step ended with the given status
pub fn assert_step_status(run: &PipelineRun, name: &str, expected: StepStatus) {
    let result = step_result(run, name);
    assert_eq!(
        result.status, expected,
        "Step '{}' should be {:?}, but was {:?} ({:?})",
        name, expected, result.status, result.error_summary
    );
}

/// Assert every step in order had the given statuses
pub fn assert_statuses(run: &PipelineRun, expected: &[(&str, StepStatus)]) {
    let expected: Vec<(String, StepStatus)> = expected
        .iter()
        .map(|(name, status)| (name.to_string(), *status))
        .collect();
    assert_eq!(statuses(run), expected);
}
