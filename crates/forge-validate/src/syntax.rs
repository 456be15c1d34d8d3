//! Mandatory syntax validator for the backend host language (§4.8).

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use forge_protocol::validation::{Severity, ValidationIssue, ValidationResult};

use crate::validator::Validator;

pub struct PythonSyntaxValidator;

#[async_trait]
impl Validator for PythonSyntaxValidator {
    fn name(&self) -> &'static str {
        "python_syntax"
    }

    fn applicable_extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    async fn validate(&self, files: &BTreeMap<String, String>) -> ValidationResult {
        let started = Instant::now();
        let mut issues = Vec::new();
        let mut parser = tree_sitter::Parser::new();
        if parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .is_err()
        {
            issues.push(ValidationIssue::error(self.name(), "failed to load python grammar"));
        } else {
            for (path, content) in files {
                if !path.ends_with(".py") {
                    continue;
                }
                match parser.parse(content, None) {
                    Some(tree) if tree.root_node().has_error() => {
                        issues.push(
                            ValidationIssue::error(self.name(), "syntax error")
                                .with_file(path.clone()),
                        );
                    }
                    Some(_) => {}
                    None => {
                        issues.push(
                            ValidationIssue::error(self.name(), "parser produced no tree")
                                .with_file(path.clone()),
                        );
                    }
                }
            }
        }

        ValidationResult {
            validator_name: self.name().to_string(),
            passed: !issues.iter().any(|i| i.severity == Severity::Error),
            issues,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

pub struct JsonStructureValidator;

#[async_trait]
impl Validator for JsonStructureValidator {
    fn name(&self) -> &'static str {
        "json_structure"
    }

    fn applicable_extensions(&self) -> &'static [&'static str] {
        &[".json"]
    }

    async fn validate(&self, files: &BTreeMap<String, String>) -> ValidationResult {
        let started = Instant::now();
        let mut issues = Vec::new();
        for (path, content) in files {
            if !path.ends_with(".json") {
                continue;
            }
            if let Err(error) = serde_json::from_str::<serde_json::Value>(content) {
                issues.push(
                    ValidationIssue::error(self.name(), error.to_string()).with_file(path.clone()),
                );
            }
        }

        ValidationResult {
            validator_name: self.name().to_string(),
            passed: issues.is_empty(),
            issues,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn valid_python_passes() {
        let mut files = BTreeMap::new();
        files.insert("a.py".to_string(), "def f():\n    return 1\n".to_string());
        let result = PythonSyntaxValidator.validate(&files).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn broken_python_fails() {
        let mut files = BTreeMap::new();
        files.insert("a.py".to_string(), "def f(:\n    return\n".to_string());
        let result = PythonSyntaxValidator.validate(&files).await;
        assert!(!result.passed);
        assert_eq!(result.issues.len(), 1);
    }

    #[tokio::test]
    async fn malformed_json_fails() {
        let mut files = BTreeMap::new();
        files.insert("pkg.json".to_string(), "{ \"a\": }".to_string());
        let result = JsonStructureValidator.validate(&files).await;
        assert!(!result.passed);
    }
}
