use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;

use crate::annotate::{self, Annotation};
use crate::config::RunConfig;
use crate::decoders::ParseOptions;
use crate::error::RunError;
use crate::models::{Conclusion, TestRunResult, Totals};
use crate::publish::Publisher;
use crate::report;
use crate::resolve::TrackedFiles;

/// One raw report file handed to the pipeline by the discovery
/// collaborator.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// A report file that could not be decoded. Recorded, not fatal.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeFailure {
    pub file: String,
    pub cause: String,
}

/// Aggregate counters exposed for downstream automation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunOutputs {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_secs: f64,
    pub conclusion: Conclusion,
}

/// Everything one pipeline run produced.
#[derive(Debug)]
pub struct RunOutput {
    pub results: Vec<TestRunResult>,
    pub decode_failures: Vec<DecodeFailure>,
    pub annotations: Vec<Annotation>,
    pub report: String,
    pub outputs: RunOutputs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Decoding,
    Aggregating,
    Reporting,
    Publishing,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Decoding => "decoding",
            RunState::Aggregating => "aggregating",
            RunState::Reporting => "reporting",
            RunState::Publishing => "publishing",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }
}

/// Drives one run: decode → aggregate → select/render → publish.
///
/// Files are decoded on blocking tasks in parallel; results are
/// reassembled in input order before annotation selection and rendering
/// so both outputs stay deterministic.
pub struct Pipeline {
    config: RunConfig,
    options: Arc<ParseOptions>,
    state: RunState,
}

impl Pipeline {
    pub fn new(config: RunConfig, tracked_files: TrackedFiles) -> Self {
        let options = Arc::new(ParseOptions {
            work_dir: Some(config.work_dir.clone()),
            tracked_files,
            parse_errors: config.parse_errors,
        });
        Self {
            config,
            options,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub async fn run(
        &mut self,
        files: Vec<InputFile>,
        publisher: &dyn Publisher,
    ) -> Result<RunOutput, RunError> {
        self.transition(RunState::Decoding);
        if files.is_empty() {
            let patterns = self.config.patterns.join(", ");
            if self.config.fail_on_empty {
                self.transition(RunState::Failed);
                return Err(RunError::NoInput { patterns });
            }
            log::warn!("no test report files matched {patterns}");
        }

        let (results, decode_failures) = self.decode_all(files).await;

        self.transition(RunState::Aggregating);
        let mut totals = Totals::default();
        for result in &results {
            totals.add(&result.totals);
        }
        let mut conclusion = if results.iter().any(|r| r.failed()) {
            Conclusion::Failure
        } else {
            Conclusion::Success
        };
        if !decode_failures.is_empty() && self.config.fail_on_parse_error {
            conclusion = Conclusion::Failure;
        }

        self.transition(RunState::Reporting);
        let annotations = annotate::select(&results, self.config.max_annotations);
        let report = report::render(&results, &self.config.report);

        let output = RunOutput {
            results,
            decode_failures,
            annotations,
            report,
            outputs: RunOutputs {
                passed: totals.passed,
                failed: totals.failed,
                skipped: totals.skipped,
                duration_secs: totals.duration_secs,
                conclusion,
            },
        };

        self.transition(RunState::Publishing);
        if let Err(error) = publisher.publish(&output).await {
            self.transition(RunState::Failed);
            return Err(error.into());
        }

        self.transition(RunState::Done);
        log::info!(
            "run complete: {} passed, {} failed, {} skipped, {} decode failure(s), conclusion {}",
            output.outputs.passed,
            output.outputs.failed,
            output.outputs.skipped,
            output.decode_failures.len(),
            output.outputs.conclusion.as_str()
        );
        Ok(output)
    }

    /// Decode every file on a blocking task. Completion order is
    /// irrelevant; `join_all` yields outcomes in spawn order, which is
    /// input order.
    async fn decode_all(
        &self,
        files: Vec<InputFile>,
    ) -> (Vec<TestRunResult>, Vec<DecodeFailure>) {
        let reporter = self.config.reporter;
        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        let handles: Vec<_> = files
            .into_iter()
            .map(|file| {
                let options = Arc::clone(&self.options);
                tokio::task::spawn_blocking(move || {
                    reporter
                        .decoder()
                        .decode(&file.name, &file.content, &options)
                })
            })
            .collect();

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (name, outcome) in names.into_iter().zip(join_all(handles).await) {
            match outcome {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(error)) => {
                    log::warn!("{error}");
                    failures.push(DecodeFailure {
                        file: error.file,
                        cause: error.cause,
                    });
                }
                Err(join_error) => {
                    log::warn!("decode task for {name} aborted: {join_error}");
                    failures.push(DecodeFailure {
                        file: name,
                        cause: format!("decode task aborted: {join_error}"),
                    });
                }
            }
        }
        (results, failures)
    }

    fn transition(&mut self, to: RunState) {
        log::debug!("pipeline {} -> {}", self.state.as_str(), to.as_str());
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::decoders::ReporterKind;
    use crate::error::PublishError;
    use crate::report::ReportConfig;

    use super::*;

    struct NullPublisher;

    #[async_trait]
    impl Publisher for NullPublisher {
        async fn publish(&self, _output: &RunOutput) -> Result<(), PublishError> {
            Ok(())
        }
    }

    fn config() -> RunConfig {
        RunConfig {
            reporter: ReporterKind::JavaJunit,
            work_dir: std::path::PathBuf::from("."),
            patterns: vec!["reports/*.xml".to_string()],
            max_annotations: 10,
            parse_errors: true,
            fail_on_empty: false,
            fail_on_parse_error: true,
            report: ReportConfig::default(),
        }
    }

    fn junit(passed: usize, failed: usize, skipped: usize) -> Vec<u8> {
        let mut cases = String::new();
        for i in 0..passed {
            cases.push_str(&format!(r#"<testcase name="p{i}" time="0.1"/>"#));
        }
        for i in 0..failed {
            cases.push_str(&format!(
                r#"<testcase name="f{i}" time="0.1"><failure message="boom"/></testcase>"#
            ));
        }
        for i in 0..skipped {
            cases.push_str(&format!(
                r#"<testcase name="s{i}"><skipped/></testcase>"#
            ));
        }
        format!(r#"<testsuite name="suite">{cases}</testsuite>"#).into_bytes()
    }

    fn input(name: &str, content: Vec<u8>) -> InputFile {
        InputFile {
            name: name.to_string(),
            content,
        }
    }

    #[tokio::test]
    async fn aggregates_across_files_in_input_order() {
        let files = vec![
            input("a.xml", junit(5, 0, 0)),
            input("b.xml", junit(3, 1, 0)),
            input("c.xml", junit(2, 0, 1)),
        ];
        let mut pipeline = Pipeline::new(config(), TrackedFiles::default());
        let output = pipeline.run(files, &NullPublisher).await.unwrap();

        assert_eq!(output.outputs.passed, 10);
        assert_eq!(output.outputs.failed, 1);
        assert_eq!(output.outputs.skipped, 1);
        assert_eq!(output.outputs.conclusion, Conclusion::Failure);
        assert_eq!(output.annotations.len(), 1);
        assert_eq!(output.results[0].source_file, "a.xml");
        assert_eq!(output.results[2].source_file, "c.xml");
        assert_eq!(pipeline.state(), RunState::Done);
    }

    #[tokio::test]
    async fn one_malformed_file_does_not_abort_the_run() {
        let files = vec![
            input("a.xml", junit(2, 0, 0)),
            input("broken.xml", b"not xml at all".to_vec()),
            input("c.xml", junit(1, 0, 0)),
        ];
        let mut pipeline = Pipeline::new(config(), TrackedFiles::default());
        let output = pipeline.run(files, &NullPublisher).await.unwrap();

        assert_eq!(output.results.len(), 2);
        assert_eq!(output.decode_failures.len(), 1);
        assert_eq!(output.decode_failures[0].file, "broken.xml");
        // Strict mode: a decode failure fails the run even with all tests green.
        assert_eq!(output.outputs.conclusion, Conclusion::Failure);
        assert_eq!(pipeline.state(), RunState::Done);
    }

    #[tokio::test]
    async fn decode_failures_are_tolerated_when_not_strict() {
        let mut cfg = config();
        cfg.fail_on_parse_error = false;
        let files = vec![
            input("a.xml", junit(2, 0, 0)),
            input("broken.xml", b"not xml".to_vec()),
        ];
        let mut pipeline = Pipeline::new(cfg, TrackedFiles::default());
        let output = pipeline.run(files, &NullPublisher).await.unwrap();
        assert_eq!(output.outputs.conclusion, Conclusion::Success);
    }

    #[tokio::test]
    async fn empty_input_warns_by_default_and_fails_when_strict() {
        let mut pipeline = Pipeline::new(config(), TrackedFiles::default());
        let output = pipeline.run(Vec::new(), &NullPublisher).await.unwrap();
        assert_eq!(output.outputs.conclusion, Conclusion::Success);
        assert_eq!(output.outputs.passed, 0);

        let mut cfg = config();
        cfg.fail_on_empty = true;
        let mut pipeline = Pipeline::new(cfg, TrackedFiles::default());
        let error = pipeline.run(Vec::new(), &NullPublisher).await.unwrap_err();
        assert!(matches!(error, RunError::NoInput { .. }));
        assert_eq!(pipeline.state(), RunState::Failed);
    }

    #[tokio::test]
    async fn zero_annotation_quota_disables_the_output() {
        let mut cfg = config();
        cfg.max_annotations = 0;
        let files = vec![input("a.xml", junit(0, 3, 0))];
        let mut pipeline = Pipeline::new(cfg, TrackedFiles::default());
        let output = pipeline.run(files, &NullPublisher).await.unwrap();
        assert!(output.annotations.is_empty());
        assert_eq!(output.outputs.failed, 3);
    }
}
