use thiserror::Error;

/// Fatal configuration problems, detected before any file is processed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no reporter selected (pass --reporter or set one in verdict.toml)")]
    MissingReporter,

    #[error("unknown reporter '{0}' (expected java-junit, dotnet-trx, jest-json or mocha-json)")]
    UnknownReporter(String),

    #[error("unknown list-suites value '{0}' (expected all or failed)")]
    UnknownListSuites(String),

    #[error("unknown list-tests value '{0}' (expected all, failed or none)")]
    UnknownListTests(String),

    #[error("max-annotations must be between 0 and {limit}, got {value}")]
    AnnotationLimit { value: usize, limit: usize },

    #[error("invalid boolean '{value}' for {field} (expected true or false)")]
    InvalidBool { field: &'static str, value: String },

    #[error("no report path patterns given (pass --path or set path in verdict.toml)")]
    MissingPatterns,
}

/// A single report file that is not well-formed for the declared format.
/// Recovered per file; the rest of the run continues.
#[derive(Debug, Error)]
#[error("failed to decode {file}: {cause}")]
pub struct DecodeError {
    pub file: String,
    pub cause: String,
}

impl DecodeError {
    pub fn new(file: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            cause: cause.into(),
        }
    }
}

/// The external publishing collaborator rejected an output.
/// Propagated as the run's final failure; the core performs no retry.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode annotations: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Non-recoverable pipeline failures.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no test report files matched {patterns}")]
    NoInput { patterns: String },

    #[error(transparent)]
    Publish(#[from] PublishError),
}
