use serde::Deserialize;

use crate::error::DecodeError;
use crate::models::{TestCase, TestError, TestRunResult, TestStatus, TestSuite};

use super::{ParseOptions, ReportDecoder, display_name, first_line};

/// Decoder for Jest JSON output (`jest --json`).
///
/// One suite per test file; `describe` nesting (ancestorTitles) collapses
/// into the case name with `" > "`. Durations arrive in milliseconds.
/// pending/todo/disabled all mean skipped.
pub struct JestDecoder;

#[derive(Debug, Deserialize)]
struct JestReport {
    #[serde(rename = "testResults")]
    test_results: Vec<JestFileResult>,
}

#[derive(Debug, Deserialize)]
struct JestFileResult {
    name: String,
    #[serde(rename = "assertionResults", default)]
    assertion_results: Vec<JestAssertion>,
}

#[derive(Debug, Deserialize)]
struct JestAssertion {
    title: String,
    #[serde(rename = "ancestorTitles", default)]
    ancestor_titles: Vec<String>,
    status: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(rename = "failureMessages", default)]
    failure_messages: Vec<String>,
    #[serde(default)]
    location: Option<JestLocation>,
}

#[derive(Debug, Deserialize)]
struct JestLocation {
    line: u32,
}

impl ReportDecoder for JestDecoder {
    fn decode(
        &self,
        file_name: &str,
        content: &[u8],
        options: &ParseOptions,
    ) -> Result<TestRunResult, DecodeError> {
        let report: JestReport = serde_json::from_slice(content)
            .map_err(|e| DecodeError::new(file_name, e.to_string()))?;

        let mut suites = Vec::with_capacity(report.test_results.len());
        for file_result in report.test_results {
            let suite_name = display_name(&file_result.name, options.work_dir.as_deref());
            let resolved_path = options.tracked_files.resolve(&suite_name);

            let mut cases = Vec::with_capacity(file_result.assertion_results.len());
            for assertion in file_result.assertion_results {
                let status = map_status(&assertion.status);
                let name = if assertion.ancestor_titles.is_empty() {
                    assertion.title
                } else {
                    format!(
                        "{} > {}",
                        assertion.ancestor_titles.join(" > "),
                        assertion.title
                    )
                };
                let error = if status == TestStatus::Failed && options.parse_errors {
                    let full = assertion.failure_messages.join("\n");
                    Some(TestError {
                        message: first_line(&full).to_string(),
                        trace: full,
                    })
                } else {
                    None
                };
                cases.push(TestCase {
                    name,
                    status,
                    duration_secs: assertion.duration.unwrap_or(0.0) / 1000.0,
                    error,
                    source_hint: Some(suite_name.clone()),
                    resolved_path: resolved_path.clone(),
                    line: assertion.location.as_ref().map(|l| l.line),
                });
            }
            suites.push(TestSuite::new(suite_name, cases));
        }
        Ok(TestRunResult::new(file_name, suites))
    }
}

fn map_status(status: &str) -> TestStatus {
    match status {
        "passed" => TestStatus::Passed,
        "failed" => TestStatus::Failed,
        // pending, skipped, todo, disabled
        _ => TestStatus::Skipped,
    }
}
