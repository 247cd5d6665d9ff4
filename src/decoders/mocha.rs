use std::collections::HashSet;

use serde::Deserialize;

use crate::error::DecodeError;
use crate::models::{TestCase, TestError, TestRunResult, TestStatus, TestSuite};

use super::{ParseOptions, ReportDecoder, display_name};

/// Decoder for Mocha's `json` reporter output.
///
/// The `tests` array preserves report order; status comes from membership
/// in the `failures`/`pending` arrays. Suite names are the `fullTitle`
/// prefix left after stripping the test's own title (nested describes are
/// already collapsed into that prefix by mocha). Durations arrive in
/// milliseconds.
pub struct MochaDecoder;

#[derive(Debug, Deserialize)]
struct MochaReport {
    // Presence distinguishes mocha output from other JSON shapes.
    #[allow(dead_code)]
    stats: MochaStats,
    #[serde(default)]
    tests: Vec<MochaTest>,
    #[serde(default)]
    failures: Vec<MochaTest>,
    #[serde(default)]
    pending: Vec<MochaTest>,
}

#[derive(Debug, Deserialize)]
struct MochaStats {
    #[allow(dead_code)]
    #[serde(default)]
    tests: u64,
}

#[derive(Debug, Deserialize)]
struct MochaTest {
    title: String,
    #[serde(rename = "fullTitle")]
    full_title: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    err: Option<MochaErr>,
}

#[derive(Debug, Default, Deserialize)]
struct MochaErr {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    stack: Option<String>,
}

impl ReportDecoder for MochaDecoder {
    fn decode(
        &self,
        file_name: &str,
        content: &[u8],
        options: &ParseOptions,
    ) -> Result<TestRunResult, DecodeError> {
        let report: MochaReport = serde_json::from_slice(content)
            .map_err(|e| DecodeError::new(file_name, e.to_string()))?;

        let failed: HashSet<&str> = report
            .failures
            .iter()
            .map(|t| t.full_title.as_str())
            .collect();
        let pending: HashSet<&str> = report
            .pending
            .iter()
            .map(|t| t.full_title.as_str())
            .collect();

        let mut suites: Vec<(String, Vec<TestCase>)> = Vec::new();
        for test in &report.tests {
            let status = if failed.contains(test.full_title.as_str()) {
                TestStatus::Failed
            } else if pending.contains(test.full_title.as_str()) {
                TestStatus::Skipped
            } else {
                TestStatus::Passed
            };

            let suite_name = suite_name(test, options);
            let hint = test
                .file
                .as_deref()
                .map(|f| display_name(f, options.work_dir.as_deref()));
            let resolved_path = hint.as_deref().and_then(|h| options.tracked_files.resolve(h));

            let error = if status == TestStatus::Failed && options.parse_errors {
                let err = test.err.as_ref();
                let message = err
                    .and_then(|e| e.message.clone())
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "test failed".to_string());
                let trace = err.and_then(|e| e.stack.clone()).unwrap_or_default();
                Some(TestError { message, trace })
            } else {
                None
            };

            let case = TestCase {
                name: test.title.clone(),
                status,
                duration_secs: test.duration.unwrap_or(0.0) / 1000.0,
                error,
                source_hint: hint,
                resolved_path,
                line: None,
            };
            match suites.iter_mut().find(|(name, _)| *name == suite_name) {
                Some((_, cases)) => cases.push(case),
                None => suites.push((suite_name, vec![case])),
            }
        }

        let suites = suites
            .into_iter()
            .map(|(name, cases)| TestSuite::new(name, cases))
            .collect();
        Ok(TestRunResult::new(file_name, suites))
    }
}

fn suite_name(test: &MochaTest, options: &ParseOptions) -> String {
    let prefix = test
        .full_title
        .strip_suffix(test.title.as_str())
        .unwrap_or("")
        .trim();
    if !prefix.is_empty() {
        return prefix.to_string();
    }
    match test.file.as_deref() {
        Some(file) => display_name(file, options.work_dir.as_deref()),
        None => "(root)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use crate::models::Conclusion;
    use crate::resolve::TrackedFiles;

    use super::*;

    const REPORT: &str = r#"{
  "stats": { "suites": 2, "tests": 4, "passes": 2, "pending": 1, "failures": 1, "duration": 250 },
  "tests": [
    {
      "title": "parses a header",
      "fullTitle": "parser parses a header",
      "file": "/repo/test/parser.spec.js",
      "duration": 15,
      "err": {}
    },
    {
      "title": "rejects an empty body",
      "fullTitle": "parser rejects an empty body",
      "file": "/repo/test/parser.spec.js",
      "duration": 40,
      "err": {
        "message": "AssertionError: expected [] to have length 1",
        "stack": "AssertionError: expected [] to have length 1\n    at Context.<anonymous> (test/parser.spec.js:31:5)"
      }
    },
    {
      "title": "round-trips",
      "fullTitle": "encoder round-trips",
      "file": "/repo/test/encoder.spec.js",
      "duration": 9,
      "err": {}
    },
    {
      "title": "handles unicode",
      "fullTitle": "encoder handles unicode",
      "file": "/repo/test/encoder.spec.js",
      "err": {}
    }
  ],
  "pending": [
    { "title": "handles unicode", "fullTitle": "encoder handles unicode" }
  ],
  "failures": [
    {
      "title": "rejects an empty body",
      "fullTitle": "parser rejects an empty body",
      "file": "/repo/test/parser.spec.js",
      "duration": 40,
      "err": {
        "message": "AssertionError: expected [] to have length 1",
        "stack": "AssertionError: expected [] to have length 1\n    at Context.<anonymous> (test/parser.spec.js:31:5)"
      }
    }
  ],
  "passes": []
}"#;

    fn options() -> ParseOptions {
        ParseOptions {
            work_dir: Some(PathBuf::from("/repo")),
            tracked_files: TrackedFiles::new(["test/parser.spec.js", "test/encoder.spec.js"]),
            parse_errors: true,
        }
    }

    #[test]
    fn statuses_come_from_failures_and_pending_membership() {
        let result = MochaDecoder
            .decode("mocha.json", REPORT.as_bytes(), &options())
            .unwrap();
        assert_eq!(result.totals.passed, 2);
        assert_eq!(result.totals.failed, 1);
        assert_eq!(result.totals.skipped, 1);
        assert_eq!(result.conclusion, Conclusion::Failure);
    }

    #[test]
    fn suites_derive_from_full_title_prefixes() {
        let result = MochaDecoder
            .decode("mocha.json", REPORT.as_bytes(), &options())
            .unwrap();
        assert_eq!(result.suites.len(), 2);
        assert_eq!(result.suites[0].name, "parser");
        assert_eq!(result.suites[1].name, "encoder");
    }

    #[test]
    fn durations_convert_from_milliseconds() {
        let result = MochaDecoder
            .decode("mocha.json", REPORT.as_bytes(), &options())
            .unwrap();
        let case = &result.suites[0].cases[1];
        assert!((case.duration_secs - 0.04).abs() < 1e-9);
    }

    #[test]
    fn failing_case_carries_error_and_resolved_path() {
        let result = MochaDecoder
            .decode("mocha.json", REPORT.as_bytes(), &options())
            .unwrap();
        let case = &result.suites[0].cases[1];
        assert_eq!(
            case.error.as_ref().unwrap().message,
            "AssertionError: expected [] to have length 1"
        );
        assert_eq!(case.resolved_path.as_deref(), Some("test/parser.spec.js"));
    }

    #[test]
    fn missing_stats_is_a_decode_error() {
        let err = MochaDecoder
            .decode("mocha.json", br#"{"testResults": []}"#, &options())
            .unwrap_err();
        assert_eq!(err.file, "mocha.json");
    }
}
