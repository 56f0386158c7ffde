//! Execution scheduler - groups steps into batches

use crate::core::Step;

/// Strategy for scheduling step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingStrategy {
    /// Execute steps in declaration order, one at a time
    #[default]
    Sequential,

    /// Run neighbouring parallel-safe steps together
    Parallel,

    /// Limited parallelism (max N concurrent steps)
    LimitedParallel(usize),
}

/// Scheduler for determining which steps run together
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionScheduler {
    strategy: SchedulingStrategy,
}

impl ExecutionScheduler {
    pub fn new(strategy: SchedulingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SchedulingStrategy {
        self.strategy
    }

    fn max_concurrency(&self) -> usize {
        match self.strategy {
            SchedulingStrategy::Sequential => 1,
            SchedulingStrategy::Parallel => usize::MAX,
            SchedulingStrategy::LimitedParallel(max) => max.max(1),
        }
    }

    /// Split `steps` into batches of indices, in declaration order.
    ///
    /// A batch holds either one step, or a run of consecutive steps marked
    /// `parallel` that never rewrite files. Batches execute one after another.
    pub fn batches(&self, steps: &[Step]) -> Vec<Vec<usize>> {
        let limit = self.max_concurrency();
        let mut batches = Vec::new();
        let mut group: Vec<usize> = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            let groupable = limit > 1 && step.parallel && !step.mutates_files();

            if groupable && !group.is_empty() && group.len() < limit {
                group.push(index);
                continue;
            }
            if !group.is_empty() {
                batches.push(std::mem::take(&mut group));
            }
            if groupable {
                group.push(index);
            } else {
                batches.push(vec![index]);
            }
        }
        if !group.is_empty() {
            batches.push(group);
        }

        batches
    }
}
