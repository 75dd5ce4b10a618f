//! Database schema.

use anyhow::Result;
use rusqlite::Connection;

/// Create tables and indexes if they are missing.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS drift_reports (
            id TEXT PRIMARY KEY,
            strategy TEXT NOT NULL,
            severity TEXT NOT NULL,
            urgency TEXT NOT NULL,
            should_retrain INTEGER NOT NULL DEFAULT 0,
            features_drifted INTEGER NOT NULL DEFAULT 0,
            decay_detected INTEGER NOT NULL DEFAULT 0,
            report_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_drift_reports_created ON drift_reports(created_at);",
    )?;
    Ok(())
}
