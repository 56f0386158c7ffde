//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Problems with a gate definition, detected before any step runs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Pipeline '{0}' declares no steps")]
    NoSteps(String),

    #[error("Duplicate step name: {0}")]
    DuplicateStep(String),

    #[error("Step '{0}' has an empty command")]
    EmptyCommand(String),

    #[error("Step '{step}' modifies files but is declared after read-only step '{after}'")]
    MutatingAfterReadOnly { step: String, after: String },

    #[error("Step '{0}' modifies files and cannot run in parallel")]
    ParallelMutating(String),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Coverage step '{0}' is not declared")]
    UnknownCoverageStep(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Step '{step}' uses {{{{ paths }}}} inside argument '{arg}'; it must be a whole argument")]
    PartialPathsPlaceholder { step: String, arg: String },

    #[error("Undefined variable '{variable}' in step '{step}'")]
    UndefinedVariable { step: String, variable: String },
}
