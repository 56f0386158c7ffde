//! Step domain model

use crate::core::scope::Scope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Argument placeholder that expands to the scope's target paths
pub const PATHS_PLACEHOLDER: &str = "{{ paths }}";

/// What kind of tool a step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Formatter; rewrites files in place when fixing
    Format,
    /// Linter; read-only
    Lint,
    /// Type checker; read-only
    TypeCheck,
    /// Test runner; read-only
    Test,
    /// Anything else; read-only
    Custom,
}

impl StepKind {
    /// Whether the tool may rewrite files in the target tree
    pub fn mutates_files(&self) -> bool {
        matches!(self, StepKind::Format)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Format => "format",
            StepKind::Lint => "lint",
            StepKind::TypeCheck => "type-check",
            StepKind::Test => "test",
            StepKind::Custom => "custom",
        }
    }
}

impl Default for StepKind {
    fn default() -> Self {
        StepKind::Custom
    }
}

/// An external program invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,

    /// Arguments, in order
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory (defaults to the scope root)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Build from a `[program, args...]` vector
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    /// Shell-like rendering for logs and reports
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.contains(char::is_whitespace) {
                    format!("'{}'", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Values that must never appear in captured output
    pub fn secret_values(&self) -> Vec<String> {
        self.env
            .iter()
            .filter(|(key, value)| is_secret_key(key) && !value.is_empty())
            .map(|(_, value)| value.clone())
            .collect()
    }
}

fn is_secret_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    ["TOKEN", "SECRET", "PASSWORD", "KEY"]
        .iter()
        .any(|marker| upper.contains(marker))
}

/// A single quality check in a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Unique step name, e.g. "lint"
    pub name: String,

    pub kind: StepKind,

    /// Check command
    pub command: CommandSpec,

    /// Command used instead of `command` when fixes are applied
    pub fix_command: Option<CommandSpec>,

    /// Failure of a required step fails the run (and halts it under fail-fast)
    pub required: bool,

    /// Timeout in seconds, 0 disables it
    pub timeout_secs: u64,

    /// May run concurrently with neighbouring parallel steps
    pub parallel: bool,

    /// Append the scope paths when no `{{ paths }}` placeholder is present
    pub pass_paths: bool,
}

impl Step {
    pub fn new(name: impl Into<String>, kind: StepKind, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            kind,
            command,
            fix_command: None,
            required: true,
            timeout_secs: 0,
            parallel: false,
            pass_paths: true,
        }
    }

    pub fn with_fix_command(mut self, command: CommandSpec) -> Self {
        self.fix_command = Some(command);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn without_paths(mut self) -> Self {
        self.pass_paths = false;
        self
    }

    /// Whether running this step (in the given fix mode) can rewrite files
    pub fn mutates_files(&self) -> bool {
        self.kind.mutates_files()
    }

    /// Resolve the concrete invocation for a scope
    pub fn invocation(&self, scope: &Scope, apply_fixes: bool) -> CommandSpec {
        let template = match (&self.fix_command, apply_fixes) {
            (Some(fix), true) => fix,
            _ => &self.command,
        };

        let paths: Vec<String> = scope
            .paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let mut args = Vec::with_capacity(template.args.len() + paths.len());
        let mut expanded = false;
        for arg in &template.args {
            if arg.trim() == PATHS_PLACEHOLDER {
                args.extend(paths.iter().cloned());
                expanded = true;
            } else {
                args.push(arg.clone());
            }
        }
        if !expanded && self.pass_paths {
            args.extend(paths);
        }

        let working_dir = match &template.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => scope.root.join(dir),
            None => scope.root.clone(),
        };

        CommandSpec {
            program: template.program.clone(),
            args,
            working_dir: Some(working_dir),
            env: template.env.clone(),
        }
    }
}

/// Replace `{{ name }}` placeholders in one left-to-right pass.
///
/// `{{ paths }}` is normalized and left for [`Step::invocation`]. Substituted
/// values are inserted verbatim, never expanded again. Returns the first
/// undefined variable on failure.
pub fn render_template(
    template: &str,
    variables: &std::collections::HashMap<String, String>,
) -> Result<String, String> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        rendered.push_str(&rest[..start]);
        let name = rest[start + 2..start + 2 + len].trim();
        if name == "paths" {
            rendered.push_str(PATHS_PLACEHOLDER);
        } else {
            let value = variables.get(name).ok_or_else(|| name.to_string())?;
            rendered.push_str(value);
        }
        rest = &rest[start + 2 + len + 2..];
    }
    rendered.push_str(rest);

    Ok(rendered)
}

/// Whether `arg` uses `{{ paths }}` without being exactly that placeholder
pub fn has_partial_paths_placeholder(arg: &str) -> bool {
    arg.contains(PATHS_PLACEHOLDER) && arg.trim() != PATHS_PLACEHOLDER
}
