//! Live console progress for a running gate
//!
//! Each running step gets an `indicatif` spinner. Finished steps, skips and
//! (when streaming) tool output lines are printed above the spinners so they
//! never tear the progress display.

use crate::cli::output::{format_execution_event, separator};
use crate::execution::ExecutionEvent;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Renders execution events to the terminal
pub struct ConsoleReporter {
    multi: MultiProgress,
    spinners: Mutex<HashMap<String, ProgressBar>>,
    stream: bool,
    visible: bool,
}

impl ConsoleReporter {
    /// `stream` prints every tool output line; `visible` false hides everything
    pub fn new(stream: bool, visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
            spinners: Mutex::new(HashMap::new()),
            stream,
            visible,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn start(&self, step_name: &str, message: String) {
        if self.multi.is_hidden() {
            self.print(message.clone());
        }
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::spinner_style());
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));

        let mut spinners = self
            .spinners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        spinners.insert(step_name.to_string(), bar);
    }

    fn finish(&self, step_name: &str) {
        let bar = self
            .spinners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(step_name);
        if let Some(bar) = bar {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }

    fn print(&self, line: String) {
        if !self.visible {
            return;
        }
        // Not a terminal: indicatif draws nothing, fall back to plain lines
        if self.multi.is_hidden() {
            eprintln!("{}", line);
        } else {
            let _ = self.multi.println(line);
        }
    }

    /// Handle one engine event
    pub fn handle(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::SetupStarted { step_name, .. }
            | ExecutionEvent::StepStarted { step_name, .. } => {
                self.start(step_name, format_execution_event(event));
            }
            ExecutionEvent::StepOutput { .. } => {
                if self.stream {
                    self.print(format_execution_event(event));
                }
            }
            ExecutionEvent::SetupFinished { result }
            | ExecutionEvent::StepFinished { result, .. } => {
                self.finish(&result.step_name);
                self.print(format_execution_event(event));
            }
            ExecutionEvent::PipelineFinished { .. } => {
                self.print(separator());
            }
            _ => self.print(format_execution_event(event)),
        }
    }
}
