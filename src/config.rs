use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::annotate::MAX_ANNOTATIONS_LIMIT;
use crate::decoders::ReporterKind;
use crate::error::ConfigError;
use crate::report::{ListSuites, ListTests, ReportConfig};

/// Options as they arrive from the outside: loosely typed strings.
/// Converted into [`RunConfig`] exactly once, at this boundary; nothing
/// downstream re-validates.
#[derive(Debug, Default)]
pub struct RawOptions {
    pub reporter: Option<String>,
    pub patterns: Vec<String>,
    pub work_dir: PathBuf,
    pub max_annotations: Option<usize>,
    pub list_suites: Option<String>,
    pub list_tests: Option<String>,
    pub only_summary: Option<String>,
    pub base_url: Option<String>,
    pub parse_errors: Option<String>,
    pub fail_on_empty: Option<String>,
    pub fail_on_parse_error: Option<String>,
}

/// Defaults from an optional `verdict.toml` in the work dir. Absent or
/// invalid files silently fall back to built-in defaults.
#[derive(Debug, Default, Deserialize)]
pub struct Defaults {
    pub reporter: Option<String>,
    #[serde(default)]
    pub path: Vec<String>,
    pub max_annotations: Option<usize>,
    pub list_suites: Option<String>,
    pub list_tests: Option<String>,
    pub only_summary: Option<bool>,
    pub base_url: Option<String>,
    pub parse_errors: Option<bool>,
    pub fail_on_empty: Option<bool>,
    pub fail_on_parse_error: Option<bool>,
}

impl Defaults {
    pub fn load(work_dir: &Path) -> Self {
        let path = work_dir.join("verdict.toml");
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        toml::from_str(&content).unwrap_or_default()
    }
}

/// Fully validated run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub reporter: ReporterKind,
    pub work_dir: PathBuf,
    pub patterns: Vec<String>,
    pub max_annotations: usize,
    pub parse_errors: bool,
    /// Zero matched input files aborts the run instead of warning.
    pub fail_on_empty: bool,
    /// A recorded decode failure flips the run conclusion to failure.
    pub fail_on_parse_error: bool,
    pub report: ReportConfig,
}

impl RunConfig {
    pub fn resolve(raw: RawOptions) -> Result<Self, ConfigError> {
        let defaults = Defaults::load(&raw.work_dir);
        Self::resolve_with(raw, defaults)
    }

    pub fn resolve_with(raw: RawOptions, defaults: Defaults) -> Result<Self, ConfigError> {
        let reporter: ReporterKind = raw
            .reporter
            .or(defaults.reporter)
            .ok_or(ConfigError::MissingReporter)?
            .parse()?;

        let patterns = if raw.patterns.is_empty() {
            defaults.path
        } else {
            raw.patterns
        };
        if patterns.is_empty() {
            return Err(ConfigError::MissingPatterns);
        }

        let max_annotations = raw
            .max_annotations
            .or(defaults.max_annotations)
            .unwrap_or(10);
        if max_annotations > MAX_ANNOTATIONS_LIMIT {
            return Err(ConfigError::AnnotationLimit {
                value: max_annotations,
                limit: MAX_ANNOTATIONS_LIMIT,
            });
        }

        let list_suites = match raw.list_suites.or(defaults.list_suites) {
            Some(value) => value.parse::<ListSuites>()?,
            None => ListSuites::default(),
        };
        let list_tests = match raw.list_tests.or(defaults.list_tests) {
            Some(value) => value.parse::<ListTests>()?,
            None => ListTests::default(),
        };

        Ok(Self {
            reporter,
            work_dir: raw.work_dir,
            patterns,
            max_annotations,
            parse_errors: effective_bool(
                "parse-errors",
                raw.parse_errors,
                defaults.parse_errors,
                true,
            )?,
            fail_on_empty: effective_bool(
                "fail-on-empty",
                raw.fail_on_empty,
                defaults.fail_on_empty,
                false,
            )?,
            fail_on_parse_error: effective_bool(
                "fail-on-parse-error",
                raw.fail_on_parse_error,
                defaults.fail_on_parse_error,
                true,
            )?,
            report: ReportConfig {
                list_suites,
                list_tests,
                only_summary: effective_bool(
                    "only-summary",
                    raw.only_summary,
                    defaults.only_summary,
                    false,
                )?,
                base_url: raw.base_url.or(defaults.base_url).unwrap_or_default(),
            },
        })
    }
}

fn effective_bool(
    field: &'static str,
    raw: Option<String>,
    default: Option<bool>,
    fallback: bool,
) -> Result<bool, ConfigError> {
    match raw {
        Some(value) => parse_bool(field, &value),
        None => Ok(default.unwrap_or(fallback)),
    }
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn raw() -> RawOptions {
        RawOptions {
            reporter: Some("java-junit".to_string()),
            patterns: vec!["reports/*.xml".to_string()],
            ..RawOptions::default()
        }
    }

    #[test]
    fn minimal_options_resolve_to_defaults() {
        let config = RunConfig::resolve_with(raw(), Defaults::default()).unwrap();
        assert_eq!(config.reporter, ReporterKind::JavaJunit);
        assert_eq!(config.max_annotations, 10);
        assert!(config.parse_errors);
        assert!(!config.fail_on_empty);
        assert!(config.fail_on_parse_error);
        assert_eq!(config.report.list_suites, ListSuites::All);
        assert_eq!(config.report.list_tests, ListTests::All);
    }

    #[test]
    fn unknown_reporter_is_fatal() {
        let mut options = raw();
        options.reporter = Some("cypress".to_string());
        let err = RunConfig::resolve_with(options, Defaults::default()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownReporter("cypress".to_string()));
    }

    #[test]
    fn missing_reporter_is_fatal() {
        let mut options = raw();
        options.reporter = None;
        let err = RunConfig::resolve_with(options, Defaults::default()).unwrap_err();
        assert_eq!(err, ConfigError::MissingReporter);
    }

    #[test]
    fn annotation_limit_is_validated_at_config_time() {
        let mut options = raw();
        options.max_annotations = Some(51);
        let err = RunConfig::resolve_with(options, Defaults::default()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::AnnotationLimit {
                value: 51,
                limit: 50
            }
        );
        let mut options = raw();
        options.max_annotations = Some(0);
        assert!(RunConfig::resolve_with(options, Defaults::default()).is_ok());
    }

    #[test]
    fn string_booleans_are_parsed_once() {
        let mut options = raw();
        options.parse_errors = Some("FALSE".to_string());
        options.fail_on_empty = Some("true".to_string());
        let config = RunConfig::resolve_with(options, Defaults::default()).unwrap();
        assert!(!config.parse_errors);
        assert!(config.fail_on_empty);

        let mut options = raw();
        options.only_summary = Some("yes".to_string());
        let err = RunConfig::resolve_with(options, Defaults::default()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidBool {
                field: "only-summary",
                value: "yes".to_string()
            }
        );
    }

    #[test]
    fn file_defaults_fill_gaps_but_never_override() {
        let defaults = Defaults {
            reporter: Some("mocha-json".to_string()),
            max_annotations: Some(25),
            list_tests: Some("failed".to_string()),
            ..Defaults::default()
        };
        let config = RunConfig::resolve_with(raw(), defaults).unwrap();
        // CLI reporter wins; file fills the rest.
        assert_eq!(config.reporter, ReporterKind::JavaJunit);
        assert_eq!(config.max_annotations, 25);
        assert_eq!(config.report.list_tests, ListTests::Failed);
    }

    #[test]
    fn defaults_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("verdict.toml"),
            "reporter = \"dotnet-trx\"\npath = [\"out/*.trx\"]\nfail_on_empty = true\n",
        )
        .unwrap();
        let defaults = Defaults::load(dir.path());
        assert_eq!(defaults.reporter.as_deref(), Some("dotnet-trx"));
        assert_eq!(defaults.path, vec!["out/*.trx".to_string()]);
        assert_eq!(defaults.fail_on_empty, Some(true));

        let missing = Defaults::load(Path::new("/nonexistent"));
        assert!(missing.reporter.is_none());
    }
}
