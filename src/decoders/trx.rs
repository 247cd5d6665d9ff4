use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::DecodeError;
use crate::models::{TestCase, TestError, TestRunResult, TestStatus, TestSuite};

use super::{ParseOptions, ReportDecoder, first_line};

/// Decoder for Visual Studio TRX files.
///
/// Results (`<UnitTestResult>`) and definitions (`<UnitTest>`) live in
/// separate sections joined by test id; suites are the definitions'
/// class names. Durations arrive as `hh:mm:ss.fraction` strings.
/// NotExecuted/Inconclusive outcomes mean skipped; Error, Timeout and
/// Aborted all mean failed.
pub struct TrxDecoder;

impl ReportDecoder for TrxDecoder {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Message,
    StackTrace,
}

struct TrxResult {
    test_id: String,
    name: String,
    status: TestStatus,
    duration_secs: f64,
    message: String,
    trace: String,
}

struct Parser<'a> {
    file: &'a str,
    options: &'a ParseOptions,
    seen_root: bool,
    definitions: HashMap<String, String>,
    results: Vec<TrxResult>,
    in_result: bool,
    section: Section,
    current_definition: Option<String>,
}

impl<'a> Parser<'a> {
    fn new(file: &'a str, options: &'a ParseOptions) -> Self {
        Self {
            file,
            options,
            seen_root: false,
            definitions: HashMap::new(),
            results: Vec::new(),
            in_result: false,
            section: Section::None,
            current_definition: None,
        }
    }

    fn open(&mut self, element: &BytesStart<'_>, empty: bool) -> Result<(), DecodeError> {
        match element.local_name().as_ref() {
            b"TestRun" => self.seen_root = true,
            b"UnitTestResult" => {
                let test_id = self.attr(element, b"testId")?.unwrap_or_default();
                let name = self
                    .attr(element, b"testName")?
                    .unwrap_or_else(|| "(unnamed)".to_string());
                let outcome = self.attr(element, b"outcome")?.unwrap_or_default();
                let duration_secs = self
                    .attr(element, b"duration")?
                    .map(|d| parse_trx_duration(&d))
                    .unwrap_or(0.0);
                self.results.push(TrxResult {
                    test_id,
                    name,
                    status: map_outcome(&outcome),
                    duration_secs,
                    message: String::new(),
                    trace: String::new(),
                });
                self.in_result = !empty;
            }
            b"UnitTest" => {
                if !empty {
                    self.current_definition = self.attr(element, b"id")?;
                }
            }
            b"TestMethod" => {
                let class_name = self.attr(element, b"className")?;
                if let (Some(id), Some(class_name)) = (self.current_definition.clone(), class_name)
                {
                    // "Namespace.Class, Assembly" → "Namespace.Class"
                    let class_name = class_name
                        .split(',')
                        .next()
                        .unwrap_or(&class_name)
                        .trim()
                        .to_string();
                    self.definitions.insert(id, class_name);
                }
            }
            b"Message" => {
                if self.in_result && self.options.parse_errors && !empty {
                    self.section = Section::Message;
                }
            }
            b"StackTrace" => {
                if self.in_result && self.options.parse_errors && !empty {
                    self.section = Section::StackTrace;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"UnitTestResult" => {
                self.in_result = false;
                self.section = Section::None;
            }
            b"UnitTest" => self.current_definition = None,
            b"Message" | b"StackTrace" => self.section = Section::None,
            _ => {}
        }
    }

    fn text(&mut self, value: &str) {
        if !self.in_result || self.section == Section::None {
            return;
        }
        if let Some(result) = self.results.last_mut() {
            let target = match self.section {
                Section::Message => &mut result.message,
                Section::StackTrace => &mut result.trace,
                Section::None => return,
            };
            if !target.is_empty() {
                target.push('\n');
            }
            target.push_str(value);
        }
    }

    fn finish(self) -> Result<TestRunResult, DecodeError> {
        if !self.seen_root {
            return Err(DecodeError::new(self.file, "missing <TestRun> root element"));
        }

        let mut suites: Vec<(String, Vec<TestCase>)> = Vec::new();
        for result in self.results {
            let class_name = self.definitions.get(&result.test_id).cloned();
            let suite_name = class_name
                .clone()
                .unwrap_or_else(|| "(unknown)".to_string());

            let error = if result.status == TestStatus::Failed && self.options.parse_errors {
                let message = if result.message.trim().is_empty() {
                    first_line(&result.trace).to_string()
                } else {
                    result.message
                };
                Some(TestError {
                    message,
                    trace: result.trace,
                })
            } else {
                None
            };
            let resolved_path = class_name
                .as_deref()
                .and_then(|c| self.options.tracked_files.resolve(c));

            let case = TestCase {
                name: result.name,
                status: result.status,
                duration_secs: result.duration_secs,
                error,
                source_hint: class_name,
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

fn map_outcome(outcome: &str) -> TestStatus {
    match outcome {
        "Passed" => TestStatus::Passed,
        "NotExecuted" | "Inconclusive" | "Pending" | "NotRunnable" => TestStatus::Skipped,
        // Failed, Error, Timeout, Aborted and anything unrecognized.
        _ => TestStatus::Failed,
    }
}

/// Parse a TRX `hh:mm:ss.fraction` duration into seconds.
fn parse_trx_duration(value: &str) -> f64 {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return value.trim().parse().unwrap_or(0.0);
    }
    let hours: f64 = parts[0].parse().unwrap_or(0.0);
    let minutes: f64 = parts[1].parse().unwrap_or(0.0);
    let seconds: f64 = parts[2].parse().unwrap_or(0.0);
    hours * 3600.0 + minutes * 60.0 + seconds
}
