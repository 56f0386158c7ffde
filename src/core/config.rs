//! Gate configuration from YAML

use crate::core::{
    error::ConfigError,
    pipeline::Pipeline,
    step::{render_template, CommandSpec, Step, StepKind},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "quality-gate.yaml";

/// Matches the `TOTAL ... NN%` line printed by pytest-cov
pub const DEFAULT_COVERAGE_PATTERN: &str = r"^TOTAL\s+.*?(\d+(?:\.\d+)?)%\s*$";

const PYTHON_PRESET: &str = r#"
name: "python-quality"
variables:
  python: "python3"
coverage:
  step: "test"
steps:
  - name: "format"
    kind: format
    command: ["{{ python }}", "-m", "black", "--check", "--diff"]
    fix_command: ["{{ python }}", "-m", "black"]
  - name: "imports"
    kind: format
    command: ["{{ python }}", "-m", "isort", "--check-only", "--diff"]
    fix_command: ["{{ python }}", "-m", "isort"]
  - name: "lint"
    kind: lint
    command: ["{{ python }}", "-m", "flake8"]
  - name: "type-check"
    kind: type_check
    command: ["{{ python }}", "-m", "mypy"]
  - name: "test"
    kind: test
    command: ["{{ python }}", "-m", "pytest", "--cov", "--cov-report=term"]
    pass_paths: false
"#;

const RUST_PRESET: &str = r#"
name: "rust-quality"
steps:
  - name: "cargo_fmt"
    kind: format
    command: ["cargo", "fmt", "--all", "--", "--check"]
    fix_command: ["cargo", "fmt", "--all"]
    pass_paths: false
  - name: "cargo_clippy"
    kind: lint
    command: ["cargo", "clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]
    pass_paths: false
  - name: "cargo_test"
    kind: test
    command: ["cargo", "test", "--workspace"]
    pass_paths: false
"#;

/// Built-in gate definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinPreset {
    /// black, isort, flake8, mypy, pytest
    Python,
    /// cargo fmt, clippy, test
    Rust,
}

/// Top-level gate configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Pipeline name
    pub name: String,

    /// Config version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// Where the tools run and which paths they check
    #[serde(default)]
    pub scope: ScopeConfig,

    /// Values substituted for `{{ name }}` in commands
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Defaults applied to every step
    #[serde(default)]
    pub defaults: StepDefaults,

    /// Report options
    #[serde(default)]
    pub report: ReportConfig,

    /// Coverage extraction and regression check
    #[serde(default)]
    pub coverage: Option<CoverageConfig>,

    /// Diagnostic rules matched against failed step output
    #[serde(default)]
    pub classifier: Vec<ClassifierRule>,

    /// Dependency-manager steps run before the checks
    #[serde(default)]
    pub setup: Vec<StepConfig>,

    /// Check steps, in execution order
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Root directory, relative to the config file's directory
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Paths checked when the scope argument is `all`
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefaults {
    /// Timeout for steps that don't set one (seconds, 0 = none)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Lines of output shown for each failed step
    #[serde(default = "default_excerpt_lines")]
    pub excerpt_lines: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            excerpt_lines: default_excerpt_lines(),
        }
    }
}

fn default_excerpt_lines() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Step whose output carries the coverage total
    pub step: String,

    /// Regex whose first capture group is the percentage
    #[serde(default = "default_coverage_pattern")]
    pub pattern: String,

    /// Allowed drop, in percentage points
    #[serde(default)]
    pub tolerance: f64,

    /// Fail the gate when coverage drops below the baseline
    #[serde(default)]
    pub fail_on_drop: bool,
}

fn default_coverage_pattern() -> String {
    DEFAULT_COVERAGE_PATTERN.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRule {
    /// Regex matched against each output line
    pub pattern: String,

    /// Suggested fix shown in the report
    pub suggestion: String,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step name
    pub name: String,

    /// Optional step description, shown by `qgate validate`
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_kind")]
    pub kind: StepKind,

    /// `[program, args...]`. An argument that is exactly `{{ paths }}`
    /// expands to the scope paths; embedding it in a larger argument is an
    /// error.
    pub command: Vec<String>,

    /// Command used in fix mode (formatters)
    #[serde(default)]
    pub fix_command: Option<Vec<String>>,

    #[serde(default = "default_true")]
    pub required: bool,

    /// Timeout for this step (overrides the default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Whether this step can run in parallel with its neighbours
    #[serde(default)]
    pub parallel: bool,

    /// Append scope paths to the arguments
    #[serde(default = "default_true")]
    pub pass_paths: bool,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_kind() -> StepKind {
    StepKind::Custom
}

fn default_true() -> bool {
    true
}

impl GateConfig {
    /// Load gate configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse gate configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a file without validating, so variable overrides can be applied
    /// first. Call [`GateConfig::validate`] afterwards.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_yaml(&content)
    }

    pub fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// One of the built-in definitions
    pub fn preset(preset: BuiltinPreset) -> Result<Self, ConfigError> {
        let yaml = match preset {
            BuiltinPreset::Python => PYTHON_PRESET,
            BuiltinPreset::Rust => RUST_PRESET,
        };
        Self::from_yaml(yaml)
    }

    /// Validate the gate configuration without running anything
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = self.to_pipeline()?;

        if let Some(coverage) = &self.coverage {
            compile_pattern(&coverage.pattern)?;
            if pipeline.step(&coverage.step).is_none() {
                return Err(ConfigError::UnknownCoverageStep(coverage.step.clone()));
            }
        }

        for rule in &self.classifier {
            compile_pattern(&rule.pattern)?;
        }

        Ok(())
    }

    /// Override or add a variable (CLI `--var key=value`)
    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Root directory of the scope, resolved against `base`
    pub fn scope_root(&self, base: &Path) -> PathBuf {
        match &self.scope.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        }
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Result<Pipeline, ConfigError> {
        let steps = self
            .steps
            .iter()
            .map(|s| self.build_step(s))
            .collect::<Result<Vec<_>, _>>()?;

        let setup = self
            .setup
            .iter()
            .map(|s| self.build_step(s))
            .collect::<Result<Vec<_>, _>>()?;

        Pipeline::new(self.name.clone(), steps)?.with_setup(setup)
    }

    fn build_step(&self, config: &StepConfig) -> Result<Step, ConfigError> {
        let command = self.build_command(config, &config.command)?;
        let fix_command = config
            .fix_command
            .as_ref()
            .map(|argv| self.build_command(config, argv))
            .transpose()?;

        Ok(Step {
            name: config.name.clone(),
            kind: config.kind,
            command,
            fix_command,
            required: config.required,
            timeout_secs: config.timeout_secs.unwrap_or(self.defaults.timeout_secs),
            parallel: config.parallel,
            pass_paths: config.pass_paths,
        })
    }

    fn build_command(&self, config: &StepConfig, argv: &[String]) -> Result<CommandSpec, ConfigError> {
        let render = |text: &str| {
            render_template(text, &self.variables).map_err(|variable| ConfigError::UndefinedVariable {
                step: config.name.clone(),
                variable,
            })
        };

        let rendered = argv
            .iter()
            .map(|arg| render(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut command = CommandSpec::from_argv(&rendered)
            .ok_or_else(|| ConfigError::EmptyCommand(config.name.clone()))?;

        if let Some(dir) = &config.working_dir {
            command.working_dir = Some(PathBuf::from(render(dir.to_string_lossy().as_ref())?));
        }
        for (key, value) in &config.env {
            command.env.insert(key.clone(), render(value.as_str())?);
        }

        Ok(command)
    }
}

/// Compile a user-supplied regex, mapping failures to a config error
pub fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
