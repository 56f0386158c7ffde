//! Tool invocation: the seam between steps and external programs

pub mod process;
pub mod streaming;

use crate::core::CommandSpec;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub use process::ProcessInvoker;
pub use streaming::{CapturedOutput, NullOutput, OutputCallback, OutputStream};

/// Errors starting or supervising a tool
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("`{program}` not found")]
    NotFound { program: String },

    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Working directory {dir} for `{program}` does not exist")]
    MissingWorkingDir { program: String, dir: PathBuf },

    #[error("Failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl InvokeError {
    pub fn from_spawn(program: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            InvokeError::NotFound {
                program: program.to_string(),
            }
        } else {
            InvokeError::Spawn {
                program: program.to_string(),
                source,
            }
        }
    }
}

/// How a tool process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub success: bool,
}

impl ToolExit {
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            success: true,
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            code: Some(code),
            success: code == 0,
        }
    }
}

/// Trait for tool execution - allows for different implementations
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Run `command` to completion, streaming each output line to `output`
    async fn invoke(
        &self,
        command: &CommandSpec,
        output: &dyn OutputCallback,
    ) -> Result<ToolExit, InvokeError>;
}
