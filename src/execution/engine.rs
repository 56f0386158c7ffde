//! Main execution engine - orchestrates the entire pipeline run

use crate::{
    core::{
        ExecutionOptions, FailureKind, FailurePolicy, OverallStatus, Pipeline, PipelineRun, Scope,
        Step, StepResult,
    },
    execution::{CancelSignal, ExecutionScheduler, SchedulingStrategy, StepExecutor},
    runner::{OutputCallback, OutputStream, ToolInvoker},
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    SetupStarted {
        step_name: String,
        command: String,
    },
    SetupFinished {
        result: StepResult,
    },
    StepStarted {
        step_name: String,
        index: usize,
        total: usize,
        command: String,
    },
    StepOutput {
        step_name: String,
        stream: OutputStream,
        line: String,
    },
    StepFinished {
        index: usize,
        result: StepResult,
    },
    StepSkipped {
        step_name: String,
        reason: String,
    },
    PipelineCancelled {
        run_id: Uuid,
    },
    PipelineFinished {
        run_id: Uuid,
        status: OverallStatus,
        passed: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Forwards tool output of one step as `StepOutput` events
struct EventOutput<'a> {
    step_name: &'a str,
    handlers: &'a [EventHandler],
}

impl OutputCallback for EventOutput<'_> {
    fn on_line(&self, stream: OutputStream, line: &str) {
        let event = ExecutionEvent::StepOutput {
            step_name: self.step_name.to_string(),
            stream,
            line: line.to_string(),
        };
        for handler in self.handlers {
            handler(&event);
        }
    }
}

/// Main pipeline execution engine
pub struct ExecutionEngine<I> {
    scheduler: ExecutionScheduler,
    executor: StepExecutor<I>,
    event_handlers: Vec<EventHandler>,
}

impl<I: ToolInvoker> ExecutionEngine<I> {
    pub fn new(invoker: I, strategy: SchedulingStrategy) -> Self {
        Self {
            scheduler: ExecutionScheduler::new(strategy),
            executor: StepExecutor::new(invoker),
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.add_event_handler(handler);
        self
    }

    pub fn invoker(&self) -> &I {
        self.executor.invoker()
    }

    /// Emit an event to all handlers
    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    fn skip(&self, run: &mut PipelineRun, step: &Step, reason: &str) {
        self.emit(ExecutionEvent::StepSkipped {
            step_name: step.name.clone(),
            reason: reason.to_string(),
        });
        run.record(StepResult::skipped(&step.name, step.kind, step.required));
    }

    async fn run_step(
        &self,
        step: &Step,
        scope: &Scope,
        options: &ExecutionOptions,
        cancel: &CancelSignal,
    ) -> StepResult {
        if self.event_handlers.is_empty() {
            return self.executor.execute(step, scope, options, cancel, None).await;
        }
        let output = EventOutput {
            step_name: &step.name,
            handlers: &self.event_handlers,
        };
        self.executor
            .execute(step, scope, options, cancel, Some(&output))
            .await
    }

    /// Execute the entire pipeline
    ///
    /// Setup steps run first; any setup failure skips every check. Check
    /// steps then run batch by batch. Under fail-fast, a failed required
    /// step skips everything after its batch. The returned run is always
    /// finished and holds exactly one result per step.
    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        scope: &Scope,
        options: &ExecutionOptions,
        cancel: &CancelSignal,
    ) -> PipelineRun {
        let mut run = PipelineRun::begin(&pipeline.name, options.policy, scope.display_paths());
        let steps = pipeline.steps();
        let total = steps.len();

        info!("Starting pipeline execution: {} ({})", pipeline.name, run.run_id);
        self.emit(ExecutionEvent::PipelineStarted {
            run_id: run.run_id,
            pipeline_name: pipeline.name.clone(),
            total_steps: total,
        });

        let mut halt_reason: Option<String> = None;
        let mut interrupted = false;

        for step in pipeline.setup() {
            if halt_reason.is_none() && cancel.is_cancelled() {
                interrupted = true;
                halt_reason = Some("cancelled".to_string());
            }
            if halt_reason.is_some() {
                run.record_setup(StepResult::skipped(&step.name, step.kind, step.required));
                continue;
            }

            self.emit(ExecutionEvent::SetupStarted {
                step_name: step.name.clone(),
                command: step.invocation(scope, options.apply_fixes).display(),
            });
            let result = self.run_step(step, scope, options, cancel).await;
            if result.failure == Some(FailureKind::Cancelled) {
                interrupted = true;
                halt_reason = Some("cancelled".to_string());
            } else if result.is_failure() {
                warn!("Setup step {} failed, skipping all checks", step.name);
                halt_reason = Some(format!("setup step '{}' failed", step.name));
            }
            self.emit(ExecutionEvent::SetupFinished {
                result: result.clone(),
            });
            run.record_setup(result);
        }

        for batch in self.scheduler.batches(steps) {
            if halt_reason.is_none() && cancel.is_cancelled() {
                interrupted = true;
                halt_reason = Some("cancelled".to_string());
            }
            if let Some(reason) = &halt_reason {
                for &index in &batch {
                    self.skip(&mut run, &steps[index], reason);
                }
                continue;
            }

            for &index in &batch {
                let step = &steps[index];
                self.emit(ExecutionEvent::StepStarted {
                    step_name: step.name.clone(),
                    index,
                    total,
                    command: step.invocation(scope, options.apply_fixes).display(),
                });
            }

            let results = if batch.len() == 1 {
                vec![self.run_step(&steps[batch[0]], scope, options, cancel).await]
            } else {
                info!("Running {} steps concurrently", batch.len());
                join_all(
                    batch
                        .iter()
                        .map(|&index| self.run_step(&steps[index], scope, options, cancel)),
                )
                .await
            };

            for (index, result) in batch.iter().copied().zip(results) {
                if result.failure == Some(FailureKind::Cancelled) {
                    interrupted = true;
                    halt_reason.get_or_insert_with(|| "cancelled".to_string());
                } else if result.is_failure()
                    && result.required
                    && options.policy == FailurePolicy::FailFast
                    && halt_reason.is_none()
                {
                    info!(
                        "Required step {} failed, skipping remaining steps",
                        result.step_name
                    );
                    halt_reason = Some(format!("required step '{}' failed", result.step_name));
                }
                self.emit(ExecutionEvent::StepFinished { index, result: result.clone() });
                run.record(result);
            }
        }

        if interrupted {
            warn!("Pipeline {} cancelled", pipeline.name);
            run.mark_cancelled();
            self.emit(ExecutionEvent::PipelineCancelled { run_id: run.run_id });
        }

        run.finish();
        let status = run.overall_status();
        info!(
            "Pipeline {} finished: {:?} ({} passed, {} failed, {} skipped)",
            pipeline.name,
            status,
            run.passed(),
            run.failed(),
            run.skipped()
        );
        self.emit(ExecutionEvent::PipelineFinished {
            run_id: run.run_id,
            status,
            passed: run.passed(),
            failed: run.failed(),
            skipped: run.skipped(),
        });

        run
    }
}
