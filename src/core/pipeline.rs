//! Pipeline domain model

use crate::core::{
    error::ConfigError,
    step::{has_partial_paths_placeholder, Step},
};
use std::collections::HashSet;

/// A validated, ordered list of quality-check steps
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Dependency-manager steps run before the checks
    setup: Vec<Step>,

    /// Check steps in declaration order
    steps: Vec<Step>,
}

impl Pipeline {
    /// Build a pipeline, rejecting step lists that break the ordering contract
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, ConfigError> {
        let name = name.into();
        if steps.is_empty() {
            return Err(ConfigError::NoSteps(name));
        }

        Self::validate_steps(&steps)?;

        Ok(Self {
            name,
            setup: Vec::new(),
            steps,
        })
    }

    /// Attach setup steps (install dependencies and the like)
    pub fn with_setup(mut self, setup: Vec<Step>) -> Result<Self, ConfigError> {
        let mut seen: HashSet<&str> = self.steps.iter().map(|s| s.name.as_str()).collect();
        for step in &setup {
            Self::validate_commands(step)?;
            if !seen.insert(step.name.as_str()) {
                return Err(ConfigError::DuplicateStep(step.name.clone()));
            }
        }
        self.setup = setup;
        Ok(self)
    }

    /// Non-empty programs; `{{ paths }}` only as a whole argument
    fn validate_commands(step: &Step) -> Result<(), ConfigError> {
        for command in std::iter::once(&step.command).chain(step.fix_command.as_ref()) {
            if command.program.trim().is_empty() {
                return Err(ConfigError::EmptyCommand(step.name.clone()));
            }
            if let Some(arg) = command.args.iter().find(|arg| has_partial_paths_placeholder(arg)) {
                return Err(ConfigError::PartialPathsPlaceholder {
                    step: step.name.clone(),
                    arg: arg.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate_steps(steps: &[Step]) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let mut first_read_only: Option<&str> = None;

        for step in steps {
            if !seen.insert(step.name.as_str()) {
                return Err(ConfigError::DuplicateStep(step.name.clone()));
            }

            Self::validate_commands(step)?;

            if step.mutates_files() {
                if step.parallel {
                    return Err(ConfigError::ParallelMutating(step.name.clone()));
                }
                if let Some(after) = first_read_only {
                    return Err(ConfigError::MutatingAfterReadOnly {
                        step: step.name.clone(),
                        after: after.to_string(),
                    });
                }
            } else if first_read_only.is_none() {
                first_read_only = Some(step.name.as_str());
            }
        }

        Ok(())
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn setup(&self) -> &[Step] {
        &self.setup
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
