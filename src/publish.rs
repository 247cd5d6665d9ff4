use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::PublishError;
use crate::pipeline::RunOutput;

/// Seam toward the external check/annotation publishing API. The core's
/// contract is synchronous request/response with explicit success or
/// failure; retry policy belongs on the collaborator side of this trait.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, output: &RunOutput) -> Result<(), PublishError>;
}

/// Publisher that writes to local sinks: the markdown report to a file or
/// stdout, annotations as JSON, and run outputs as `key=value` lines for
/// downstream automation.
#[derive(Debug, Default)]
pub struct LocalPublisher {
    pub report_path: Option<PathBuf>,
    pub annotations_path: Option<PathBuf>,
    pub outputs_path: Option<PathBuf>,
}

impl LocalPublisher {
    fn write(path: &Path, content: &[u8]) -> Result<(), PublishError> {
        std::fs::write(path, content).map_err(|source| PublishError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

#[async_trait]
impl Publisher for LocalPublisher {
    async fn publish(&self, output: &RunOutput) -> Result<(), PublishError> {
        match &self.report_path {
            Some(path) => Self::write(path, output.report.as_bytes())?,
            None => println!("{}", output.report),
        }

        if let Some(path) = &self.annotations_path {
            let json = serde_json::to_vec_pretty(&output.annotations)?;
            Self::write(path, &json)?;
        }

        if let Some(path) = &self.outputs_path {
            let totals = &output.outputs;
            let lines = format!(
                "passed={}\nfailed={}\nskipped={}\ntime={:.3}\nconclusion={}\n",
                totals.passed,
                totals.failed,
                totals.skipped,
                totals.duration_secs,
                totals.conclusion.as_str()
            );
            Self::write(path, lines.as_bytes())?;
        }
        Ok(())
    }
}
