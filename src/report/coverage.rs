//! Coverage extraction and regression check

use crate::core::{config::compile_pattern, config::CoverageConfig, ConfigError, PipelineRun};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Reads the total coverage percentage out of a step's output
#[derive(Debug, Clone)]
pub struct CoverageProbe {
    step: String,
    pattern: Regex,
    tolerance: f64,
    fail_on_drop: bool,
}

/// Result of comparing a run's coverage with the stored baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageCheck {
    pub current: f64,
    /// None when there is no earlier successful run
    pub baseline: Option<f64>,
    pub tolerance: f64,
    pub regressed: bool,
    pub fail_on_drop: bool,
}

impl CoverageCheck {
    /// Whether the regression should fail the gate
    pub fn fails_gate(&self) -> bool {
        self.regressed && self.fail_on_drop
    }

    pub fn delta(&self) -> Option<f64> {
        self.baseline.map(|baseline| self.current - baseline)
    }
}

impl CoverageProbe {
    pub fn from_config(config: &CoverageConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            step: config.step.clone(),
            pattern: compile_pattern(&config.pattern)?,
            tolerance: config.tolerance.max(0.0),
            fail_on_drop: config.fail_on_drop,
        })
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    /// Percentage from the last matching line
    pub fn extract(&self, lines: &[String]) -> Option<f64> {
        lines
            .iter()
            .rev()
            .filter_map(|line| self.pattern.captures(line))
            .find_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
    }

    /// Coverage measured by this run, if the coverage step ran
    pub fn measure(&self, run: &PipelineRun) -> Option<f64> {
        let result = run.result(&self.step)?;
        if result.is_skipped() {
            return None;
        }
        self.extract(&result.captured_output)
    }

    pub fn compare(&self, current: f64, baseline: Option<f64>) -> CoverageCheck {
        let regressed = baseline.is_some_and(|baseline| current < baseline - self.tolerance);
        CoverageCheck {
            current,
            baseline,
            tolerance: self.tolerance,
            regressed,
            fail_on_drop: self.fail_on_drop,
        }
    }
}
