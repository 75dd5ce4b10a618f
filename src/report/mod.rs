//! Drift report assembly and emission.
//!
//! A [`DriftReport`] bundles one analysis cycle. The [`ReportEmitter`] builds
//! it, runs the advisor, and performs exactly one write through a
//! [`ReportSink`]. The report comes back to the caller whether or not the
//! write succeeded so a failed write can be retried elsewhere.

pub mod sink;

pub use sink::JsonFileSink;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::drift::{recommend, DecayResult, DriftResult, Recommendation};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("report sink '{sink}' write failed: {source}")]
    SinkWriteFailure {
        sink: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("report sink '{sink}' timed out after {after:?}")]
    Timeout { sink: String, after: Duration },
}

/// One analysis cycle: drift, optional decay and the resulting advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub timestamp: DateTime<Utc>,
    pub drift: DriftResult,
    pub decay: Option<DecayResult>,
    pub recommendation: Recommendation,
}

impl DriftReport {
    pub fn assemble(drift: DriftResult, decay: Option<DecayResult>) -> Self {
        let recommendation = recommend(&drift, decay.as_ref());
        Self {
            timestamp: Utc::now(),
            drift,
            decay,
            recommendation,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Destination for finished reports (file, database, queue...).
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    async fn write(&self, report: &DriftReport) -> Result<(), ReportError>;
}

/// Outcome of [`ReportEmitter::emit`].
#[derive(Debug)]
pub struct Emission {
    pub report: DriftReport,
    pub write: Result<(), ReportError>,
}

pub struct ReportEmitter {
    sink: Box<dyn ReportSink>,
    timeout: Duration,
}

impl ReportEmitter {
    pub fn new(sink: Box<dyn ReportSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Assemble the report and write it once. Never retries.
    pub async fn emit(&self, drift: DriftResult, decay: Option<DecayResult>) -> Emission {
        let report = DriftReport::assemble(drift, decay);

        let write = match tokio::time::timeout(self.timeout, self.sink.write(&report)).await {
            Ok(result) => result,
            Err(_) => Err(ReportError::Timeout {
                sink: self.sink.name().to_string(),
                after: self.timeout,
            }),
        };

        match &write {
            Ok(()) => info!(
                sink = self.sink.name(),
                urgency = %report.recommendation.urgency,
                "drift report written"
            ),
            Err(e) => error!(sink = self.sink.name(), error = %e, "drift report write failed"),
        }

        Emission { report, write }
    }
}
