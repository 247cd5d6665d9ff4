pub mod jest;
pub mod junit;
pub mod mocha;
pub mod trx;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, DecodeError};
use crate::models::TestRunResult;
use crate::resolve::TrackedFiles;

/// The closed registry of supported report formats. Selected once per run;
/// all files in a run are assumed homogeneous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterKind {
    JavaJunit,
    DotnetTrx,
    JestJson,
    MochaJson,
}

impl ReporterKind {
    pub const ALL: [ReporterKind; 4] = [
        ReporterKind::JavaJunit,
        ReporterKind::DotnetTrx,
        ReporterKind::JestJson,
        ReporterKind::MochaJson,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReporterKind::JavaJunit => "java-junit",
            ReporterKind::DotnetTrx => "dotnet-trx",
            ReporterKind::JestJson => "jest-json",
            ReporterKind::MochaJson => "mocha-json",
        }
    }

    pub fn decoder(&self) -> &'static dyn ReportDecoder {
        match self {
            ReporterKind::JavaJunit => &junit::JunitDecoder,
            ReporterKind::DotnetTrx => &trx::TrxDecoder,
            ReporterKind::JestJson => &jest::JestDecoder,
            ReporterKind::MochaJson => &mocha::MochaDecoder,
        }
    }
}

impl FromStr for ReporterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownReporter(s.to_string()))
    }
}

/// Options threaded into every decode call. The working directory is an
/// explicit parameter; decoders never read ambient process state.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub work_dir: Option<PathBuf>,
    pub tracked_files: TrackedFiles,
    /// When false, decoders keep aggregate counts exact but skip
    /// extracting structured message/trace detail.
    pub parse_errors: bool,
}

/// A format decoder turns one raw report file into a normalized
/// [`TestRunResult`]. Decoders are stateless and shared across files.
pub trait ReportDecoder: Send + Sync {
    fn decode(
        &self,
        file_name: &str,
        content: &[u8],
        options: &ParseOptions,
    ) -> Result<TestRunResult, DecodeError>;
}

/// Strip the working directory prefix from a reported absolute path so
/// suite names stay workspace-relative.
pub(crate) fn display_name(path: &str, work_dir: Option<&Path>) -> String {
    let normalized = path.replace('\\', "/");
    let Some(work_dir) = work_dir else {
        return normalized;
    };
    let prefix = work_dir.to_string_lossy().replace('\\', "/");
    normalized
        .strip_prefix(prefix.as_str())
        .map(|rest| rest.trim_start_matches('/').to_string())
        .unwrap_or(normalized)
}

pub(crate) fn first_line(text: &str) -> &str {
    text.lines().find(|line| !line.trim().is_empty()).unwrap_or("")
}
