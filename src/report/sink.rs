//! File-backed report sink.

use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;

use super::{DriftReport, ReportError, ReportSink};

/// Writes each report as pretty-printed JSON to a fixed path, replacing
/// whatever was there.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn write_file(&self, body: String) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create report directory: {}", parent.display()))?;
        }
        tokio::fs::write(&self.path, body)
            .await
            .with_context(|| format!("failed to write report: {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReportSink for JsonFileSink {
    fn name(&self) -> &str {
        "json"
    }

    async fn write(&self, report: &DriftReport) -> Result<(), ReportError> {
        let body = report.to_json_pretty()?;
        self.write_file(body)
            .await
            .map_err(|source| ReportError::SinkWriteFailure {
                sink: self.name().to_string(),
                source,
            })?;
        debug!(path = %self.path.display(), "report file written");
        Ok(())
    }
}
