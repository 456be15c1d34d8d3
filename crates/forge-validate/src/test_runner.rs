//! The adjunct test runner (§4.8): a separate pass from the validator
//! registry, executed in an isolated temp directory with its own total
//! timeout.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use forge_protocol::validation::TestRunResult;
use tokio::process::Command;

const TEST_SUITE_TIMEOUT: Duration = Duration::from_secs(120);

fn has_test_files(files: &BTreeMap<String, String>) -> bool {
    files.keys().any(|path| {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        file_name.starts_with("test_")
            || file_name.ends_with("_test.py")
            || file_name.ends_with(".test.js")
            || path.contains("/tests/")
    })
}

/// Runs the project's test suite if test files are detected, returning
/// `None` when there is nothing to run. The 120 s timeout bounds the
/// whole suite, not any individual test.
pub async fn run_tests(files: &BTreeMap<String, String>) -> Option<TestRunResult> {
    if !has_test_files(files) {
        return None;
    }

    let dir = tempfile::tempdir().ok()?;
    for (path, content) in files {
        let dest = forge_protocol::path_safety::safe_relative_join(dir.path(), path)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.ok()?;
        }
        tokio::fs::write(&dest, content).await.ok()?;
    }

    let has_python_tests = files.keys().any(|p| p.ends_with(".py") && p.contains("test"));
    let started = Instant::now();
    let command_future = async {
        if has_python_tests {
            Command::new("pytest").arg("-q").current_dir(dir.path()).output().await
        } else {
            Command::new("npm").args(["test", "--silent"]).current_dir(dir.path()).output().await
        }
    };

    let output = match tokio::time::timeout(TEST_SUITE_TIMEOUT, command_future).await {
        Ok(Ok(output)) => output,
        Ok(Err(error)) => {
            return Some(TestRunResult {
                passed: 0,
                failed: 0,
                skipped: 0,
                coverage_percent: None,
                output_log: format!("test runner could not start: {error}"),
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }
        Err(_) => {
            return Some(TestRunResult {
                passed: 0,
                failed: 0,
                skipped: 0,
                coverage_percent: None,
                output_log: format!("test suite exceeded {:?} timeout", TEST_SUITE_TIMEOUT),
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }
    };

    let log = String::from_utf8_lossy(&output.stdout).to_string();
    let (passed, failed, skipped) = parse_pytest_summary(&log);
    Some(TestRunResult {
        passed,
        failed,
        skipped,
        coverage_percent: None,
        output_log: log,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

/// Pytest's final summary line looks like `"3 passed, 1 failed, 2
/// skipped in 0.42s"`. Parses what it finds and defaults absent counts
/// to zero.
fn parse_pytest_summary(log: &str) -> (u32, u32, u32) {
    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for line in log.lines().rev() {
        if !line.contains("passed") && !line.contains("failed") && !line.contains("error") {
            continue;
        }
        for chunk in line.split(',') {
            let chunk = chunk.trim();
            let mut parts = chunk.split_whitespace();
            if let Some(count) = parts.next().and_then(|n| n.parse::<u32>().ok()) {
                if chunk.contains("passed") {
                    passed = count;
                } else if chunk.contains("failed") || chunk.contains("error") {
                    failed = count;
                } else if chunk.contains("skipped") {
                    skipped = count;
                }
            }
        }
        break;
    }
    (passed, failed, skipped)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_pytest_summary_line() {
        let (passed, failed, skipped) = parse_pytest_summary("3 passed, 1 failed, 2 skipped in 0.42s");
        assert_eq!((passed, failed, skipped), (3, 1, 2));
    }

    #[test]
    fn detects_test_files_by_name() {
        let mut files = BTreeMap::new();
        files.insert("test_app.py".to_string(), String::new());
        assert!(has_test_files(&files));
    }

    #[test]
    fn no_tests_detected_for_plain_source() {
        let mut files = BTreeMap::new();
        files.insert("app.py".to_string(), String::new());
        assert!(!has_test_files(&files));
    }
}
