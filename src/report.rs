use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::{TestRunResult, TestSuite};

/// Size ceiling of the publishing target's report body, in bytes.
/// Truncation drops trailing detail sections; the aggregate header is
/// always preserved.
pub const REPORT_SIZE_LIMIT: usize = 65_535;

const TRUNCATION_NOTICE: &str =
    "\n_Report truncated: size limit reached, remaining detail omitted._\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListSuites {
    #[default]
    All,
    Failed,
}

impl FromStr for ListSuites {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ListSuites::All),
            "failed" => Ok(ListSuites::Failed),
            other => Err(ConfigError::UnknownListSuites(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListTests {
    #[default]
    All,
    Failed,
    None,
}

impl FromStr for ListTests {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ListTests::All),
            "failed" => Ok(ListTests::Failed),
            "none" => Ok(ListTests::None),
            other => Err(ConfigError::UnknownListTests(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    pub list_suites: ListSuites,
    pub list_tests: ListTests,
    /// Emit only the aggregate header, suppressing all suite/test detail.
    pub only_summary: bool,
    /// Deep-link prefix for per-file sections; empty when no check-run
    /// URL exists yet.
    pub base_url: String,
}

/// Render the hierarchical markdown summary. Pure: identical inputs
/// produce byte-identical output.
pub fn render(results: &[TestRunResult], config: &ReportConfig) -> String {
    render_with_limit(results, config, REPORT_SIZE_LIMIT)
}

pub(crate) fn render_with_limit(
    results: &[TestRunResult],
    config: &ReportConfig,
    size_limit: usize,
) -> String {
    let mut totals = crate::models::Totals::default();
    for result in results {
        totals.add(&result.totals);
    }
    let conclusion = if results.iter().any(|r| r.failed()) {
        crate::models::Conclusion::Failure
    } else {
        crate::models::Conclusion::Success
    };

    let mut out = String::new();
    let _ = writeln!(out, "# Test Results");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "### {} {} passed, {} failed, {} skipped ({})",
        conclusion.icon(),
        totals.passed,
        totals.failed,
        totals.skipped,
        format_duration(totals.duration_secs)
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "|✔ Passed|✘ Failed|⊘ Skipped|Time|");
    let _ = writeln!(out, "|---:|---:|---:|---:|");
    let _ = writeln!(
        out,
        "|{}|{}|{}|{}|",
        totals.passed,
        totals.failed,
        totals.skipped,
        format_duration(totals.duration_secs)
    );

    if config.only_summary {
        return out;
    }

    for result in results {
        let section = render_result(result, config);
        if out.len() + section.len() > size_limit.saturating_sub(TRUNCATION_NOTICE.len()) {
            out.push_str(TRUNCATION_NOTICE);
            break;
        }
        out.push_str(&section);
    }
    out
}

fn render_result(result: &TestRunResult, config: &ReportConfig) -> String {
    let mut out = String::new();
    let name = if config.base_url.is_empty() {
        result.source_file.clone()
    } else {
        format!("[{}]({})", result.source_file, config.base_url)
    };
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "<details><summary>{} {}: {} passed, {} failed, {} skipped ({})</summary>",
        result.conclusion.icon(),
        name,
        result.totals.passed,
        result.totals.failed,
        result.totals.skipped,
        format_duration(result.totals.duration_secs)
    );

    for suite in &result.suites {
        if config.list_suites == ListSuites::Failed && suite.totals.failed == 0 {
            continue;
        }
        out.push_str(&render_suite(suite, config));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "</details>");
    out
}

fn render_suite(suite: &TestSuite, config: &ReportConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**{}** ({})",
        suite.name,
        format_duration(suite.totals.duration_secs)
    );

    if config.list_tests == ListTests::None {
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "|Result|Test|Time|");
    let _ = writeln!(out, "|:---:|:---|---:|");
    for case in &suite.cases {
        if config.list_tests == ListTests::Failed && !case.failed() {
            continue;
        }
        let _ = writeln!(
            out,
            "|{}|{}|{}|",
            case.status.icon(),
            case.name,
            format_duration(case.duration_secs)
        );
    }
    out
}

pub(crate) fn format_duration(secs: f64) -> String {
    if secs < 1.0 {
        format!("{}ms", (secs * 1000.0).round() as u64)
    } else if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        let total = secs.round() as u64;
        format!("{}m {}s", total / 60, total % 60)
    }
}
