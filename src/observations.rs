//! Observation batches: rows of named feature values.
//!
//! On disk a batch is either a JSON array of row objects or JSON lines (one
//! row object per line). A `null`, a missing key or a non-finite number all
//! mean "no value" for that feature in that row.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::features;

/// One feature row. `None` marks a missing value.
pub type Row = BTreeMap<String, Option<f64>>;

/// Raw training-time samples used by the distribution test. Same shape as
/// a production batch.
pub type ReferenceSamples = ObservationBatch;

#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("failed to read observations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed observation row at line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationBatch {
    rows: Vec<Row>,
}

impl ObservationBatch {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Build a batch by running feature extraction over raw URLs.
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = urls
            .into_iter()
            .map(|u| features::extract(u.as_ref()).to_row())
            .collect();
        Self { rows }
    }

    /// Build a batch from dense columns. Handy for synthetic batches.
    pub fn from_columns(columns: &[(&str, Vec<f64>)]) -> Self {
        let len = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let rows = (0..len)
            .map(|i| {
                columns
                    .iter()
                    .map(|(name, values)| (name.to_string(), values.get(i).copied()))
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Every feature name that appears in at least one row.
    pub fn feature_names(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect()
    }

    /// Non-missing values of `feature`, in row order.
    ///
    /// Returns `None` when the feature never appears in the batch at all.
    pub fn column(&self, feature: &str) -> Option<Vec<f64>> {
        let mut seen = false;
        let mut values = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            if let Some(cell) = row.get(feature) {
                seen = true;
                if let Some(v) = cell.filter(|v| v.is_finite()) {
                    values.push(v);
                }
            }
        }
        seen.then_some(values)
    }

    /// Parse either a JSON array of rows or JSON lines.
    pub fn parse(content: &str) -> Result<Self, ObservationError> {
        let trimmed = content.trim_start();
        if trimmed.starts_with('[') {
            let rows: Vec<Row> = serde_json::from_str(trimmed)
                .map_err(|source| ObservationError::Malformed { line: 1, source })?;
            return Ok(Self { rows });
        }

        let mut rows = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row: Row = serde_json::from_str(line)
                .map_err(|source| ObservationError::Malformed { line: idx + 1, source })?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn load(path: &Path) -> Result<Self, ObservationError> {
        let content = std::fs::read_to_string(path).map_err(|source| ObservationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let batch = Self::parse(&content)?;
        debug!(path = %path.display(), rows = batch.len(), "loaded observation batch");
        Ok(batch)
    }
}
