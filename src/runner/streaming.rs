//! Line-by-line output delivery from running tools
//!
//! Tools write to stdout and stderr while they run. The invoker hands every
//! complete line to an [`OutputCallback`] as soon as it arrives, so a console
//! can show progress live while the executor keeps a copy for the report.
//!
//! # Example
//!
//! ```
//! use quality_gate::runner::{OutputCallback, OutputStream};
//!
//! struct LivePrinter;
//!
//! impl OutputCallback for LivePrinter {
//!     fn on_line(&self, stream: OutputStream, line: &str) {
//!         match stream {
//!             OutputStream::Stdout => println!("{}", line),
//!             OutputStream::Stderr => eprintln!("{}", line),
//!         }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Replacement for secret values in captured output
pub const REDACTED: &str = "***";

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Callback for lines as they arrive from a running tool
///
/// This trait is object-safe and can be used as `&dyn OutputCallback`.
pub trait OutputCallback: Send + Sync {
    /// Called once per complete line, without the trailing newline
    fn on_line(&self, stream: OutputStream, line: &str);
}

/// Discards every line
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl OutputCallback for NullOutput {
    fn on_line(&self, _stream: OutputStream, _line: &str) {}
}

/// Collects lines (with secrets masked) and optionally forwards them
pub struct CapturedOutput<'a> {
    lines: Mutex<Vec<String>>,
    secrets: Vec<String>,
    forward: Option<&'a dyn OutputCallback>,
}

impl<'a> CapturedOutput<'a> {
    pub fn new(secrets: Vec<String>, forward: Option<&'a dyn OutputCallback>) -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            secrets,
            forward,
        }
    }

    fn redact(&self, line: &str) -> String {
        self.secrets
            .iter()
            .fold(line.to_string(), |acc, secret| acc.replace(secret.as_str(), REDACTED))
    }

    /// Lines captured so far
    pub fn len(&self) -> usize {
        self.lines.lock().map(|lines| lines.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OutputCallback for CapturedOutput<'_> {
    fn on_line(&self, stream: OutputStream, line: &str) {
        let line = self.redact(line);
        if let Some(forward) = self.forward {
            forward.on_line(stream, &line);
        }
        let mut lines = self
            .lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push(line);
    }
}
