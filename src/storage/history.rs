//! Persisted history of drift reports.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

use crate::drift::{Severity, Urgency};
use crate::report::{DriftReport, ReportError, ReportSink};
use crate::storage::Pool;

/// A report read back from the database.
#[derive(Debug, Serialize)]
pub struct StoredReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub severity: Severity,
    pub urgency: Urgency,
    pub should_retrain: bool,
    pub report: DriftReport,
}

#[derive(Clone)]
pub struct ReportHistory {
    pool: Pool,
}

impl ReportHistory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn record(&self, report: &DriftReport) -> Result<Uuid> {
        let conn = self.pool.get()?;
        let id = Uuid::new_v4();
        let report_json = serde_json::to_string(report)?;

        conn.execute(
            "INSERT INTO drift_reports
                (id, strategy, severity, urgency, should_retrain, features_drifted,
                 decay_detected, report_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.to_string(),
                report.drift.strategy,
                report.drift.severity.to_string(),
                report.recommendation.urgency.to_string(),
                report.recommendation.should_retrain,
                report.drift.features_with_drift.len() as i64,
                report.decay.as_ref().is_some_and(|d| d.decay_detected),
                report_json,
                report.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        Ok(id)
    }

    /// Most recent reports first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<StoredReport>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, report_json FROM drift_reports ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut reports = Vec::new();
        for r in rows {
            let (id_str, report_json) = r?;
            let id = Uuid::parse_str(&id_str)
                .with_context(|| format!("corrupt report id in history: {}", id_str))?;
            let report: DriftReport = serde_json::from_str(&report_json)
                .with_context(|| format!("corrupt report body for {}", id))?;
            reports.push(StoredReport {
                id,
                created_at: report.timestamp,
                severity: report.drift.severity,
                urgency: report.recommendation.urgency,
                should_retrain: report.recommendation.should_retrain,
                report,
            });
        }
        Ok(reports)
    }
}

#[async_trait::async_trait]
impl ReportSink for ReportHistory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn write(&self, report: &DriftReport) -> Result<(), ReportError> {
        let history = self.clone();
        let report = report.clone();

        let outcome = tokio::task::spawn_blocking(move || history.record(&report))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|inner| inner);

        match outcome {
            Ok(id) => {
                tracing::debug!(%id, "report stored");
                Ok(())
            }
            Err(source) => Err(ReportError::SinkWriteFailure {
                sink: self.name().to_string(),
                source,
            }),
        }
    }
}
