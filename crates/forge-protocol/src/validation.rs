//! Validation issue/result shapes (§3, §4.8).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    pub validator_name: String,
    pub severity: Severity,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
    pub fixable: bool,
}

impl ValidationIssue {
    pub fn error(validator_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            validator_name: validator_name.into(),
            severity: Severity::Error,
            file: None,
            line: None,
            column: None,
            message: message.into(),
            fixable: false,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_location(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub validator_name: String,
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
    pub elapsed_ms: u64,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

/// The aggregated outcome of running every applicable validator over one
/// file set (§4.8 "Aggregated result").
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AggregatedValidation {
    pub results: Vec<ValidationResult>,
    pub total_elapsed_ms: u64,
    pub test_result: Option<TestRunResult>,
}

impl AggregatedValidation {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn all_issues(&self) -> Vec<&ValidationIssue> {
        self.results.iter().flat_map(|r| r.issues.iter()).collect()
    }

    pub fn error_issues(&self) -> Vec<&ValidationIssue> {
        self.all_issues()
            .into_iter()
            .filter(|i| i.severity == Severity::Error)
            .collect()
    }
}

/// The adjunct test runner's structured result (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TestRunResult {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub coverage_percent: Option<f32>,
    pub output_log: String,
    pub elapsed_ms: u64,
}
