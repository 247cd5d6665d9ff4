use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::DecodeError;
use crate::models::{TestCase, TestError, TestRunResult, TestStatus, TestSuite};

use super::{ParseOptions, ReportDecoder, first_line};

/// Decoder for JUnit-style XML (`<testsuites>`/`<testsuite>`/`<testcase>`).
///
/// Durations arrive as fractional seconds in the `time` attribute. Nested
/// `<testsuite>` groups are flattened into the two-level Suite→Case shape
/// by joining intermediate names with `" > "`. `<error>` elements map to
/// failed; only `<skipped>` means skipped.
pub struct JunitDecoder;

impl ReportDecoder for JunitDecoder {
    fn decode(
        &self,
        file_name: &str,
        content: &[u8],
        options: &ParseOptions,
    ) -> Result<TestRunResult, DecodeError> {
        let text = std::str::from_utf8(content)
            .map_err(|e| DecodeError::new(file_name, format!("invalid UTF-8: {e}")))?;

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut parser = Parser::new(file_name, options);
        loop {
            let event = reader
                .read_event()
                .map_err(|e| DecodeError::new(file_name, e.to_string()))?;
            match event {
                Event::Start(e) => parser.open(&e, false)?,
                Event::Empty(e) => parser.open(&e, true)?,
                Event::End(e) => parser.close(e.local_name().as_ref()),
                Event::Text(t) => {
                    let value = t
                        .unescape()
                        .map_err(|e| DecodeError::new(file_name, e.to_string()))?;
                    parser.text(&value);
                }
                Event::CData(t) => {
                    let raw = t.into_inner();
                    parser.text(&String::from_utf8_lossy(&raw));
                }
                Event::Eof => break,
                _ => {}
            }
        }
        parser.finish()
    }
}

#[derive(Debug)]
struct PendingCase {
    name: String,
    duration_secs: f64,
    status: TestStatus,
    message: Option<String>,
    trace: String,
    hint: Option<String>,
    line: Option<u32>,
}

struct SuiteAcc {
    name: String,
    cases: Vec<TestCase>,
}

struct Parser<'a> {
    file: &'a str,
    options: &'a ParseOptions,
    stack: Vec<String>,
    suites: Vec<SuiteAcc>,
    current: Option<PendingCase>,
    in_failure_detail: bool,
    seen_root: bool,
}

impl<'a> Parser<'a> {
    fn new(file: &'a str, options: &'a ParseOptions) -> Self {
        Self {
            file,
            options,
            stack: Vec::new(),
            suites: Vec::new(),
            current: None,
            in_failure_detail: false,
            seen_root: false,
        }
    }

    fn open(&mut self, element: &BytesStart<'_>, empty: bool) -> Result<(), DecodeError> {
        match element.local_name().as_ref() {
            b"testsuites" => self.seen_root = true,
            b"testsuite" => {
                self.seen_root = true;
                if !empty {
                    let name = self
                        .attr(element, b"name")?
                        .unwrap_or_else(|| "(unnamed)".to_string());
                    self.stack.push(name);
                }
            }
            b"testcase" => {
                let name = self
                    .attr(element, b"name")?
                    .unwrap_or_else(|| "(unnamed)".to_string());
                let duration_secs = self
                    .attr(element, b"time")?
                    .and_then(|t| t.trim().parse().ok())
                    .unwrap_or(0.0);
                let hint = match self.attr(element, b"file")? {
                    Some(file) => Some(file),
                    None => self.attr(element, b"classname")?,
                };
                let line = self.attr(element, b"line")?.and_then(|l| l.parse().ok());
                let case = PendingCase {
                    name,
                    duration_secs,
                    status: TestStatus::Passed,
                    message: None,
                    trace: String::new(),
                    hint,
                    line,
                };
                self.current = Some(case);
                if empty {
                    self.finish_case();
                }
            }
            b"failure" | b"error" => {
                let message = if self.options.parse_errors {
                    self.attr(element, b"message")?
                } else {
                    None
                };
                if let Some(case) = self.current.as_mut() {
                    case.status = TestStatus::Failed;
                    if self.options.parse_errors {
                        case.message = message;
                        self.in_failure_detail = !empty;
                    }
                }
            }
            b"skipped" => {
                if let Some(case) = self.current.as_mut() {
                    case.status = TestStatus::Skipped;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"testcase" => self.finish_case(),
            b"testsuite" => {
                self.stack.pop();
            }
            b"failure" | b"error" => self.in_failure_detail = false,
            _ => {}
        }
    }

    fn text(&mut self, value: &str) {
        if !self.in_failure_detail {
            return;
        }
        if let Some(case) = self.current.as_mut() {
            if !case.trace.is_empty() {
                case.trace.push('\n');
            }
            case.trace.push_str(value);
        }
    }

    fn finish_case(&mut self) {
        let Some(pending) = self.current.take() else {
            return;
        };
        self.in_failure_detail = false;

        let error = if pending.status == TestStatus::Failed && self.options.parse_errors {
            let message = pending
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| first_line(&pending.trace).to_string());
            Some(TestError {
                message,
                trace: pending.trace,
            })
        } else {
            None
        };
        let resolved_path = pending
            .hint
            .as_deref()
            .and_then(|h| self.options.tracked_files.resolve(h));

        let suite_name = if self.stack.is_empty() {
            "(root)".to_string()
        } else {
            self.stack.join(" > ")
        };
        let idx = match self.suites.iter().position(|s| s.name == suite_name) {
            Some(idx) => idx,
            None => {
                self.suites.push(SuiteAcc {
                    name: suite_name,
                    cases: Vec::new(),
                });
                self.suites.len() - 1
            }
        };
        self.suites[idx].cases.push(TestCase {
            name: pending.name,
            status: pending.status,
            duration_secs: pending.duration_secs,
            error,
            source_hint: pending.hint,
            resolved_path,
            line: pending.line,
        });
    }

    fn finish(self) -> Result<TestRunResult, DecodeError> {
        if !self.seen_root {
            return Err(DecodeError::new(
                self.file,
                "missing <testsuites> or <testsuite> root element",
            ));
        }
        let suites = self
            .suites
            .into_iter()
            .map(|s| TestSuite::new(s.name, s.cases))
            .collect();
        Ok(TestRunResult::new(self.file, suites))
    }

    fn attr(
        &self,
        element: &BytesStart<'_>,
        name: &[u8],
    ) -> Result<Option<String>, DecodeError> {
        for attr in element.attributes() {
            let attr = attr.map_err(|e| DecodeError::new(self.file, e.to_string()))?;
            if attr.key.as_ref() == name {
                let value = attr
                    .unescape_value()
                    .map_err(|e| DecodeError::new(self.file, e.to_string()))?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }
}
