//! Parallel static/security/format/test validation with an auto-fix
//! feedback loop (C8, §4.8).

pub mod external;
pub mod syntax;
pub mod test_runner;
pub mod validator;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use forge_protocol::validation::{AggregatedValidation, ValidationIssue, ValidationResult};

pub use validator::Validator;

const DEFAULT_VALIDATOR_TIMEOUT: Duration = Duration::from_secs(60);

/// Registry of [`Validator`]s executed concurrently over one file set
/// (§4.8 "Execution").
pub struct ValidationPipeline {
    validators: Vec<Box<dyn Validator>>,
    per_validator_timeout: Duration,
}

impl ValidationPipeline {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self {
            validators,
            per_validator_timeout: DEFAULT_VALIDATOR_TIMEOUT,
        }
    }

    /// The bundled-parser-based mandatory validators plus every optional
    /// validator whose external tool happens to be installed (§4.8
    /// "Mandatory" / "Optional").
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Box::new(syntax::PythonSyntaxValidator),
            Box::new(syntax::JsonStructureValidator),
            Box::new(external::TypeCheckerValidator),
            Box::new(external::SecurityScannerValidator),
            Box::new(external::PythonFormatterValidator),
            Box::new(external::JsLinterValidator),
            Box::new(external::JsFormatterValidator),
            Box::new(external::TsCompilerValidator),
        ])
    }

    /// Run every applicable, available validator concurrently, each
    /// bounded by `per_validator_timeout`; merge results deterministically
    /// by validator name, then run the adjunct test runner (§5 "Ordering
    /// guarantees").
    #[tracing::instrument(skip(self, files), fields(file_count = files.len()))]
    pub async fn run(&self, files: &BTreeMap<String, String>) -> AggregatedValidation {
        let started = Instant::now();
        let mut applicable = Vec::new();
        for validator in &self.validators {
            if validator::applies_to(validator.as_ref(), files) && validator.is_available().await {
                applicable.push(validator.as_ref());
            }
        }

        let timeout = self.per_validator_timeout;
        let futures = applicable.into_iter().map(|validator| async move {
            match tokio::time::timeout(timeout, validator.validate(files)).await {
                Ok(result) => result,
                Err(_) => ValidationResult {
                    validator_name: validator.name().to_string(),
                    passed: false,
                    issues: vec![ValidationIssue::error(
                        validator.name(),
                        format!("validator exceeded {timeout:?} timeout"),
                    )],
                    elapsed_ms: timeout.as_millis() as u64,
                },
            }
        });

        let mut results: Vec<ValidationResult> = futures::future::join_all(futures).await;
        results.sort_by(|a, b| a.validator_name.cmp(&b.validator_name));

        let test_result = test_runner::run_tests(files).await;

        AggregatedValidation {
            results,
            total_elapsed_ms: started.elapsed().as_millis() as u64,
            test_result,
        }
    }

    /// Run every available auto-fix, merging the results into a single
    /// file-set patch. Validators are consulted in registration order;
    /// a later validator's fix for the same path wins (§4.8 "Auto-fix
    /// loop" re-emits only the affected files, so in practice each
    /// validator touches disjoint files).
    pub async fn auto_fix(&self, files: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut fixed = BTreeMap::new();
        for validator in &self.validators {
            if !validator::applies_to(validator.as_ref(), files) || !validator.is_available().await {
                continue;
            }
            if let Some(patch) = validator.auto_fix(files).await {
                fixed.extend(patch);
            }
        }
        fixed
    }
}

/// Builds the directive message handed to the Quality/Debug agent during
/// the auto-fix loop (§4.8 "issues with severity Error are formatted
/// into a directive message").
pub fn format_repair_directive(aggregated: &AggregatedValidation) -> String {
    let errors = aggregated.error_issues();
    if errors.is_empty() {
        return String::new();
    }

    let mut directive = String::from(
        "The following validation errors must be fixed. Re-emit only the affected files.\n\n",
    );
    for issue in errors {
        let location = match (&issue.file, issue.line) {
            (Some(file), Some(line)) => format!("{file}:{line}"),
            (Some(file), None) => file.clone(),
            _ => "<unknown file>".to_string(),
        };
        directive.push_str(&format!(
            "- [{}] {}: {}\n",
            issue.validator_name, location, issue.message
        ));
    }
    directive
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mandatory_validators_run_without_external_tools() {
        let pipeline = ValidationPipeline::with_defaults();
        let mut files = BTreeMap::new();
        files.insert("app.py".to_string(), "def f():\n    return 1\n".to_string());
        let aggregated = pipeline.run(&files).await;
        assert!(aggregated
            .results
            .iter()
            .any(|r| r.validator_name == "python_syntax"));
    }

    #[tokio::test]
    async fn syntax_error_is_reported_and_fails_pipeline() {
        let pipeline = ValidationPipeline::with_defaults();
        let mut files = BTreeMap::new();
        files.insert("app.py".to_string(), "def f(:\n".to_string());
        let aggregated = pipeline.run(&files).await;
        assert!(!aggregated.passed());
        assert!(!aggregated.error_issues().is_empty());
    }

    #[tokio::test]
    async fn results_are_merged_deterministically_by_name() {
        let pipeline = ValidationPipeline::with_defaults();
        let mut files = BTreeMap::new();
        files.insert("app.py".to_string(), "x = 1\n".to_string());
        files.insert("pkg.json".to_string(), "{}".to_string());
        let aggregated = pipeline.run(&files).await;
        let names: Vec<&str> = aggregated
            .results
            .iter()
            .map(|r| r.validator_name.as_str())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn repair_directive_is_empty_without_errors() {
        let aggregated = AggregatedValidation::default();
        assert!(format_repair_directive(&aggregated).is_empty());
    }

    #[test]
    fn repair_directive_lists_each_error() {
        let aggregated = AggregatedValidation {
            results: vec![ValidationResult {
                validator_name: "python_syntax".to_string(),
                passed: false,
                issues: vec![ValidationIssue::error("python_syntax", "syntax error")
                    .with_file("app.py")
                    .with_location(3, 1)],
                elapsed_ms: 5,
            }],
            total_elapsed_ms: 5,
            test_result: None,
        };
        let directive = format_repair_directive(&aggregated);
        assert!(directive.contains("app.py:3"));
        assert!(directive.contains("syntax error"));
    }
}
