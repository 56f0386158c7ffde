//! Pipeline execution engine

pub mod cancel;
pub mod engine;
pub mod executor;
pub mod scheduler;

pub use cancel::{CancelHandle, CancelSignal};
pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{failure_summary, StepExecutor};
pub use scheduler::{ExecutionScheduler, SchedulingStrategy};
