use serde::Serialize;

use super::status::{Conclusion, TestStatus};

/// Structured failure detail extracted from a report file.
/// `trace` may be empty when the format carried no stack data.
#[derive(Debug, Clone, Serialize)]
pub struct TestError {
    pub message: String,
    pub trace: String,
}

/// One test case as reported by the originating format. Built once during
/// decode and immutable afterward.
#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    pub name: String,
    pub status: TestStatus,
    pub duration_secs: f64,
    pub error: Option<TestError>,
    /// Raw file/class hint from the report (often a dotted class name, not
    /// a literal path). May be absent or unreliable.
    pub source_hint: Option<String>,
    /// Repository-relative path the hint resolved to, when resolution
    /// found exactly one tracked candidate.
    pub resolved_path: Option<String>,
    pub line: Option<u32>,
}

impl TestCase {
    pub fn failed(&self) -> bool {
        self.status == TestStatus::Failed
    }
}

/// Aggregated counters, tallied once at decode time and never recomputed
/// from children (display filters must not change them).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Totals {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_secs: f64,
}

impl Totals {
    pub fn tally(cases: &[TestCase]) -> Self {
        let mut totals = Totals::default();
        for case in cases {
            match case.status {
                TestStatus::Passed => totals.passed += 1,
                TestStatus::Failed => totals.failed += 1,
                TestStatus::Skipped => totals.skipped += 1,
            }
            totals.duration_secs += case.duration_secs;
        }
        totals
    }

    pub fn add(&mut self, other: &Totals) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.duration_secs += other.duration_secs;
    }

    pub fn count(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// A named group of test cases. Insertion order is report order and is
/// significant for display.
#[derive(Debug, Clone, Serialize)]
pub struct TestSuite {
    pub name: String,
    pub cases: Vec<TestCase>,
    pub totals: Totals,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, cases: Vec<TestCase>) -> Self {
        let totals = Totals::tally(&cases);
        Self {
            name: name.into(),
            cases,
            totals,
        }
    }
}

/// The normalized outcome of decoding one report file. One file yields one
/// result; results are never merged across files.
#[derive(Debug, Clone, Serialize)]
pub struct TestRunResult {
    pub source_file: String,
    pub suites: Vec<TestSuite>,
    pub totals: Totals,
    pub conclusion: Conclusion,
}

impl TestRunResult {
    pub fn new(source_file: impl Into<String>, suites: Vec<TestSuite>) -> Self {
        let mut totals = Totals::default();
        for suite in &suites {
            totals.add(&suite.totals);
        }
        let conclusion = if totals.failed > 0 {
            Conclusion::Failure
        } else {
            Conclusion::Success
        };
        Self {
            source_file: source_file.into(),
            suites,
            totals,
            conclusion,
        }
    }

    pub fn failed(&self) -> bool {
        self.conclusion == Conclusion::Failure
    }
}
