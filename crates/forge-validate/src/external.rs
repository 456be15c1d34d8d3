//! Optional validators, invoked only when their external tool is present
//! on the host (§4.8): type checker, security scanner, formatter, JS
//! linter, JS formatter, TypeScript compiler.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use forge_protocol::validation::{Severity, ValidationIssue, ValidationResult};
use tokio::process::Command;

use crate::validator::Validator;

async fn tool_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

async fn materialize(files: &BTreeMap<String, String>, extensions: &[&str]) -> Option<tempfile::TempDir> {
    let dir = tempfile::tempdir().ok()?;
    let mut wrote_any = false;
    for (path, content) in files {
        if !extensions.iter().any(|ext| path.ends_with(ext)) {
            continue;
        }
        let dest = forge_protocol::path_safety::safe_relative_join(dir.path(), path)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.ok()?;
        }
        tokio::fs::write(&dest, content).await.ok()?;
        wrote_any = true;
    }
    wrote_any.then_some(dir)
}

/// Splits `tool`'s combined stdout+stderr into one issue per non-empty
/// line, defaulting to `Error` — good enough for tools whose output is
/// one diagnostic per line (mypy, eslint, tsc all format this way).
fn issues_from_lines(validator_name: &str, output: &str, severity: Severity) -> Vec<ValidationIssue> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| ValidationIssue {
            validator_name: validator_name.to_string(),
            severity,
            file: None,
            line: None,
            column: None,
            message: line.to_string(),
            fixable: false,
        })
        .collect()
}

pub struct TypeCheckerValidator;

#[async_trait]
impl Validator for TypeCheckerValidator {
    fn name(&self) -> &'static str {
        "mypy"
    }

    fn applicable_extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    async fn is_available(&self) -> bool {
        tool_available("mypy").await
    }

    async fn validate(&self, files: &BTreeMap<String, String>) -> ValidationResult {
        let started = Instant::now();
        let issues = match materialize(files, self.applicable_extensions()).await {
            Some(dir) => {
                let output = Command::new("mypy")
                    .arg(".")
                    .current_dir(dir.path())
                    .output()
                    .await;
                match output {
                    Ok(output) if output.status.success() => Vec::new(),
                    Ok(output) => issues_from_lines(
                        self.name(),
                        &String::from_utf8_lossy(&output.stdout),
                        Severity::Error,
                    ),
                    Err(error) => vec![ValidationIssue::error(self.name(), error.to_string())],
                }
            }
            None => Vec::new(),
        };

        ValidationResult {
            validator_name: self.name().to_string(),
            passed: !issues.iter().any(|i| i.severity == Severity::Error),
            issues,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

pub struct SecurityScannerValidator;

#[async_trait]
impl Validator for SecurityScannerValidator {
    fn name(&self) -> &'static str {
        "bandit"
    }

    fn applicable_extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    async fn is_available(&self) -> bool {
        tool_available("bandit").await
    }

    async fn validate(&self, files: &BTreeMap<String, String>) -> ValidationResult {
        let started = Instant::now();
        let mut issues = Vec::new();
        if let Some(dir) = materialize(files, self.applicable_extensions()).await {
            let output = Command::new("bandit")
                .args(["-r", ".", "-f", "json"])
                .current_dir(dir.path())
                .output()
                .await;
            if let Ok(output) = output {
                if let Ok(report) = serde_json::from_slice::<serde_json::Value>(&output.stdout) {
                    if let Some(results) = report.get("results").and_then(|v| v.as_array()) {
                        for finding in results {
                            let severity = match finding
                                .get("issue_severity")
                                .and_then(|v| v.as_str())
                                .unwrap_or("LOW")
                            {
                                "HIGH" => Severity::Error,
                                "MEDIUM" => Severity::Warning,
                                _ => Severity::Info,
                            };
                            let message = finding
                                .get("issue_text")
                                .and_then(|v| v.as_str())
                                .unwrap_or("security finding")
                                .to_string();
                            let file = finding
                                .get("filename")
                                .and_then(|v| v.as_str())
                                .map(|s| s.to_string());
                            issues.push(ValidationIssue {
                                validator_name: self.name().to_string(),
                                severity,
                                file,
                                line: finding
                                    .get("line_number")
                                    .and_then(|v| v.as_u64())
                                    .map(|n| n as u32),
                                column: None,
                                message,
                                fixable: false,
                            });
                        }
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

pub struct PythonFormatterValidator;

#[async_trait]
impl Validator for PythonFormatterValidator {
    fn name(&self) -> &'static str {
        "black"
    }

    fn applicable_extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    async fn is_available(&self) -> bool {
        tool_available("black").await
    }

    async fn validate(&self, files: &BTreeMap<String, String>) -> ValidationResult {
        let started = Instant::now();
        let mut issues = Vec::new();
        if let Some(dir) = materialize(files, self.applicable_extensions()).await {
            let status = Command::new("black")
                .args(["--check", "--quiet", "."])
                .current_dir(dir.path())
                .status()
                .await;
            if matches!(status, Ok(status) if !status.success()) {
                issues.push(
                    ValidationIssue::error(self.name(), "files are not black-formatted").fixable(),
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

    async fn auto_fix(&self, files: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
        let dir = materialize(files, self.applicable_extensions()).await?;
        Command::new("black")
            .args(["--quiet", "."])
            .current_dir(dir.path())
            .status()
            .await
            .ok()?;

        let mut fixed = BTreeMap::new();
        for path in files.keys().filter(|p| p.ends_with(".py")) {
            let dest = forge_protocol::path_safety::safe_relative_join(dir.path(), path)?;
            let content = tokio::fs::read_to_string(dest).await.ok()?;
            fixed.insert(path.clone(), content);
        }
        Some(fixed)
    }
}

pub struct JsLinterValidator;

#[async_trait]
impl Validator for JsLinterValidator {
    fn name(&self) -> &'static str {
        "eslint"
    }

    fn applicable_extensions(&self) -> &'static [&'static str] {
        &[".js", ".jsx"]
    }

    async fn is_available(&self) -> bool {
        tool_available("eslint").await
    }

    async fn validate(&self, files: &BTreeMap<String, String>) -> ValidationResult {
        let started = Instant::now();
        let issues = match materialize(files, self.applicable_extensions()).await {
            Some(dir) => {
                let output = Command::new("eslint").arg(".").current_dir(dir.path()).output().await;
                match output {
                    Ok(output) if output.status.success() => Vec::new(),
                    Ok(output) => issues_from_lines(
                        self.name(),
                        &String::from_utf8_lossy(&output.stdout),
                        Severity::Warning,
                    ),
                    Err(error) => vec![ValidationIssue::error(self.name(), error.to_string())],
                }
            }
            None => Vec::new(),
        };

        ValidationResult {
            validator_name: self.name().to_string(),
            passed: !issues.iter().any(|i| i.severity == Severity::Error),
            issues,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

pub struct JsFormatterValidator;

#[async_trait]
impl Validator for JsFormatterValidator {
    fn name(&self) -> &'static str {
        "prettier"
    }

    fn applicable_extensions(&self) -> &'static [&'static str] {
        &[".js", ".jsx"]
    }

    async fn is_available(&self) -> bool {
        tool_available("prettier").await
    }

    async fn validate(&self, files: &BTreeMap<String, String>) -> ValidationResult {
        let started = Instant::now();
        let mut issues = Vec::new();
        if let Some(dir) = materialize(files, self.applicable_extensions()).await {
            let status = Command::new("prettier")
                .args(["--check", "."])
                .current_dir(dir.path())
                .status()
                .await;
            if matches!(status, Ok(status) if !status.success()) {
                issues.push(
                    ValidationIssue::error(self.name(), "files are not prettier-formatted")
                        .fixable(),
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

    async fn auto_fix(&self, files: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
        let dir = materialize(files, self.applicable_extensions()).await?;
        Command::new("prettier")
            .args(["--write", "."])
            .current_dir(dir.path())
            .status()
            .await
            .ok()?;

        let mut fixed = BTreeMap::new();
        for path in files.keys().filter(|p| p.ends_with(".js") || p.ends_with(".jsx")) {
            let dest = forge_protocol::path_safety::safe_relative_join(dir.path(), path)?;
            let content = tokio::fs::read_to_string(dest).await.ok()?;
            fixed.insert(path.clone(), content);
        }
        Some(fixed)
    }
}

pub struct TsCompilerValidator;

#[async_trait]
impl Validator for TsCompilerValidator {
    fn name(&self) -> &'static str {
        "tsc"
    }

    fn applicable_extensions(&self) -> &'static [&'static str] {
        &[".ts", ".tsx"]
    }

    async fn is_available(&self) -> bool {
        tool_available("tsc").await
    }

    async fn validate(&self, files: &BTreeMap<String, String>) -> ValidationResult {
        let started = Instant::now();
        let issues = match materialize(files, self.applicable_extensions()).await {
            Some(dir) => {
                let output = Command::new("tsc")
                    .args(["--noEmit"])
                    .current_dir(dir.path())
                    .output()
                    .await;
                match output {
                    Ok(output) if output.status.success() => Vec::new(),
                    Ok(output) => issues_from_lines(
                        self.name(),
                        &String::from_utf8_lossy(&output.stdout),
                        Severity::Error,
                    ),
                    Err(error) => vec![ValidationIssue::error(self.name(), error.to_string())],
                }
            }
            None => Vec::new(),
        };

        ValidationResult {
            validator_name: self.name().to_string(),
            passed: !issues.iter().any(|i| i.severity == Severity::Error),
            issues,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}
