use std::collections::HashMap;

use serde::Serialize;

use crate::models::TestRunResult;

/// Per-annotation message ceiling. Publishing targets impose hard size
/// limits on annotation bodies; content past the budget is cut, never
/// rejected.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Upper bound accepted for the per-run annotation quota.
pub const MAX_ANNOTATIONS_LIMIT: usize = 50;

/// Placeholder path used when a failing test's source hint did not resolve
/// to a tracked file.
pub const UNKNOWN_FILE: &str = "file unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Warning,
    Failure,
}

/// One inline pointer from a failing test to a best-effort source
/// location. Regenerated on every invocation, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub path: String,
    pub line: u32,
    pub level: AnnotationLevel,
    pub title: String,
    pub message: String,
}

/// Select up to `limit` annotations, one per failed case, walking results
/// in file→suite→case input order. No reordering, no deduplication:
/// repeated identical failures each consume quota independently.
/// `limit == 0` disables the output entirely.
pub fn select(results: &[TestRunResult], limit: usize) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    if limit == 0 {
        return annotations;
    }

    // Suite names shared across the run get their cases suite-qualified.
    let mut suite_name_uses: HashMap<&str, usize> = HashMap::new();
    for result in results {
        for suite in &result.suites {
            *suite_name_uses.entry(suite.name.as_str()).or_default() += 1;
        }
    }

    'outer: for result in results {
        for suite in &result.suites {
            let qualify = suite_name_uses.get(suite.name.as_str()).copied().unwrap_or(0) > 1;
            for case in &suite.cases {
                if !case.failed() {
                    continue;
                }
                let title = if qualify {
                    format!("{} > {}", suite.name, case.name)
                } else {
                    case.name.clone()
                };
                let mut message = match &case.error {
                    Some(error) if !error.trace.is_empty() => {
                        format!("{}\n\n{}", error.message, error.trace)
                    }
                    Some(error) => error.message.clone(),
                    None => "test failed".to_string(),
                };
                message = truncate(&message, MAX_MESSAGE_CHARS);

                annotations.push(Annotation {
                    path: case
                        .resolved_path
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_FILE.to_string()),
                    line: case.line.unwrap_or(1),
                    level: AnnotationLevel::Failure,
                    title,
                    message,
                });
                if annotations.len() == limit {
                    break 'outer;
                }
            }
        }
    }
    annotations
}

fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut out: String = text.chars().take(budget.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::models::{TestCase, TestError, TestRunResult, TestStatus, TestSuite};

    use super::*;

    fn failed_case(name: &str, path: Option<&str>, line: Option<u32>) -> TestCase {
        TestCase {
            name: name.to_string(),
            status: TestStatus::Failed,
            duration_secs: 0.1,
            error: Some(TestError {
                message: format!("{name} assertion failed"),
                trace: "at somewhere:1".to_string(),
            }),
            source_hint: None,
            resolved_path: path.map(str::to_string),
            line,
        }
    }

    fn passed_case(name: &str) -> TestCase {
        TestCase {
            name: name.to_string(),
            status: TestStatus::Passed,
            duration_secs: 0.1,
            error: None,
            source_hint: None,
            resolved_path: None,
            line: None,
        }
    }

    fn run(file: &str, suites: Vec<TestSuite>) -> TestRunResult {
        TestRunResult::new(file, suites)
    }

    #[test]
    fn selection_is_bounded_and_ordered() {
        let results = vec![
            run(
                "a.xml",
                vec![TestSuite::new(
                    "alpha",
                    vec![
                        failed_case("first", Some("src/a.rs"), Some(3)),
                        passed_case("ok"),
                        failed_case("second", None, None),
                    ],
                )],
            ),
            run(
                "b.xml",
                vec![TestSuite::new(
                    "beta",
                    vec![failed_case("third", Some("src/b.rs"), Some(9))],
                )],
            ),
        ];

        let annotations = select(&results, 2);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].title, "first");
        assert_eq!(annotations[1].title, "second");

        let all = select(&results, 50);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].title, "third");
    }

    #[test]
    fn zero_limit_yields_nothing() {
        let results = vec![run(
            "a.xml",
            vec![TestSuite::new("alpha", vec![failed_case("f", None, None)])],
        )];
        assert!(select(&results, 0).is_empty());
    }

    #[test]
    fn unresolved_paths_fall_back_to_placeholder() {
        let results = vec![run(
            "a.xml",
            vec![TestSuite::new("alpha", vec![failed_case("f", None, None)])],
        )];
        let annotations = select(&results, 10);
        assert_eq!(annotations[0].path, UNKNOWN_FILE);
        assert_eq!(annotations[0].line, 1);
    }

    #[test]
    fn duplicate_suite_names_qualify_titles() {
        let results = vec![
            run(
                "a.xml",
                vec![TestSuite::new("common", vec![failed_case("f", None, None)])],
            ),
            run(
                "b.xml",
                vec![TestSuite::new("common", vec![failed_case("g", None, None)])],
            ),
        ];
        let annotations = select(&results, 10);
        assert_eq!(annotations[0].title, "common > f");
        assert_eq!(annotations[1].title, "common > g");
    }

    #[test]
    fn messages_are_truncated_to_budget() {
        let mut case = failed_case("long", None, None);
        case.error = Some(TestError {
            message: "m".repeat(10),
            trace: "t".repeat(MAX_MESSAGE_CHARS * 2),
        });
        let results = vec![run("a.xml", vec![TestSuite::new("alpha", vec![case])])];
        let annotations = select(&results, 1);
        assert_eq!(annotations[0].message.chars().count(), MAX_MESSAGE_CHARS);
        assert!(annotations[0].message.ends_with('…'));
    }

    #[test]
    fn repeated_failures_are_not_deduplicated() {
        let make = || {
            run(
                "same.xml",
                vec![TestSuite::new("s", vec![failed_case("dup", None, None)])],
            )
        };
        let results = vec![make(), make()];
        // Suite "s" appears twice, so titles are qualified; both survive.
        let annotations = select(&results, 10);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].title, annotations[1].title);
    }
}
