//! Training-time baseline: per-feature moments and performance metrics.
//!
//! The baseline is produced by the training pipeline and is read-only here.
//! It is loaded once per analysis and passed by reference into every call.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::drift::stats::Sample;
use crate::drift::DriftError;
use crate::observations::ObservationBatch;

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("baseline not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read baseline {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed baseline {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Mean and (sample) standard deviation of one feature over the training set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub feature_statistics: BTreeMap<String, FeatureStatistics>,
    #[serde(default)]
    pub performance_baseline: BTreeMap<String, f64>,
}

impl Baseline {
    /// Derive a baseline from a reference batch (usually the training set).
    pub fn from_batch(
        batch: &ObservationBatch,
        performance_baseline: BTreeMap<String, f64>,
    ) -> Result<Self, DriftError> {
        if batch.is_empty() {
            return Err(DriftError::EmptyObservationSet);
        }

        let mut feature_statistics = BTreeMap::new();
        for name in batch.feature_names() {
            let values = batch.column(name).unwrap_or_default();
            if values.is_empty() {
                continue;
            }
            let sample = Sample::new(values);
            feature_statistics.insert(
                name.to_string(),
                FeatureStatistics {
                    mean: sample.mean(),
                    std: sample.std_dev(),
                },
            );
        }

        Ok(Self {
            feature_statistics,
            performance_baseline,
        })
    }

    /// Check the fields the moment-shift strategy relies on.
    pub fn validate(&self) -> Result<(), DriftError> {
        if self.feature_statistics.is_empty() {
            return Err(DriftError::InvalidBaseline(
                "feature_statistics is empty".to_string(),
            ));
        }
        for (name, stats) in &self.feature_statistics {
            if !stats.mean.is_finite() || !stats.std.is_finite() {
                return Err(DriftError::InvalidBaseline(format!(
                    "feature '{}' has non-finite statistics",
                    name
                )));
            }
        }
        for (name, value) in &self.performance_baseline {
            if !value.is_finite() {
                return Err(DriftError::InvalidBaseline(format!(
                    "metric '{}' is not a finite number",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write baseline {}", path.display()))?;
        info!(path = %path.display(), features = self.feature_statistics.len(), "baseline written");
        Ok(())
    }
}

/// Load a baseline snapshot from a JSON file.
///
/// Unknown top-level keys (training metadata and the like) are ignored.
pub fn load_baseline(path: &Path) -> Result<Baseline, BaselineError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            BaselineError::NotFound(path.to_path_buf())
        } else {
            BaselineError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let baseline: Baseline =
        serde_json::from_str(&content).map_err(|source| BaselineError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    info!(
        path = %path.display(),
        features = baseline.feature_statistics.len(),
        metrics = baseline.performance_baseline.len(),
        "loaded baseline"
    );
    Ok(baseline)
}

/// Load current operational metrics: a flat JSON object of `name -> number`.
pub fn load_metrics(path: &Path) -> anyhow::Result<BTreeMap<String, f64>> {
    use anyhow::Context;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read metrics file: {}", path.display()))?;
    let metrics: BTreeMap<String, f64> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse metrics file: {}", path.display()))?;
    Ok(metrics)
}
