//! Pluggable diagnostic classification of tool output

use crate::core::{config::compile_pattern, config::ClassifierRule, ConfigError};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One recognised problem in a step's output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// The rule that matched
    pub pattern: String,
    pub suggested_fix: String,
    /// The output line that matched
    pub line: String,
}

/// Maps captured output to findings with suggested fixes
pub trait Classifier: Send + Sync {
    fn classify(&self, captured_output: &[String]) -> Vec<Finding>;
}

/// Regex rules from the `classifier:` config section
///
/// Each line is matched against the rules in order; the first matching rule
/// produces the finding for that line. Repeated identical findings are
/// reported once.
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    rules: Vec<(Regex, String)>,
}

impl RuleClassifier {
    pub fn from_rules(rules: &[ClassifierRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|rule| Ok((compile_pattern(&rule.pattern)?, rule.suggestion.clone())))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

impl Classifier for RuleClassifier {
    fn classify(&self, captured_output: &[String]) -> Vec<Finding> {
        let mut findings: Vec<Finding> = Vec::new();
        for line in captured_output {
            let Some((regex, suggestion)) = self.rules.iter().find(|(regex, _)| regex.is_match(line)) else {
                continue;
            };
            let finding = Finding {
                pattern: regex.as_str().to_string(),
                suggested_fix: suggestion.clone(),
                line: line.trim().to_string(),
            };
            if !findings.contains(&finding) {
                findings.push(finding);
            }
        }
        findings
    }
}
