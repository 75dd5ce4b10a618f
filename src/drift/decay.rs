//! Performance decay against the training-time metrics.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default relative decay tolerated before a metric is flagged.
pub const DECAY_THRESHOLD: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceComparison {
    pub baseline_value: f64,
    pub current_value: f64,
    pub decay: f64,
    pub decay_ratio: f64,
    pub exceeded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayResult {
    pub decay_detected: bool,
    pub metrics_with_decay: BTreeSet<String>,
    pub per_metric: BTreeMap<String, PerformanceComparison>,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

impl DecayResult {
    /// Largest decay ratio over every compared metric.
    pub fn max_decay_ratio(&self) -> Option<f64> {
        self.per_metric
            .values()
            .map(|c| c.decay_ratio)
            .fold(None, |acc, r| Some(acc.map_or(r, |m: f64| m.max(r))))
    }
}

/// Compare current metrics with the baseline values.
///
/// Metrics without a baseline value are skipped. A baseline value of zero
/// (or below) yields a decay ratio of 0 rather than dividing by it.
pub fn detect_decay(
    current_metrics: &BTreeMap<String, f64>,
    baseline_performance: &BTreeMap<String, f64>,
    threshold: f64,
) -> DecayResult {
    let mut per_metric = BTreeMap::new();
    let mut metrics_with_decay = BTreeSet::new();

    for (metric, &current_value) in current_metrics {
        let Some(&baseline_value) = baseline_performance.get(metric) else {
            debug!(%metric, "metric has no baseline value, skipping");
            continue;
        };

        let decay = baseline_value - current_value;
        let decay_ratio = if baseline_value > 0.0 {
            decay / baseline_value
        } else {
            0.0
        };
        let exceeded = decay_ratio > threshold;

        if exceeded {
            warn!(
                %metric,
                baseline = baseline_value,
                current = current_value,
                decay_ratio,
                "performance decay over threshold"
            );
            metrics_with_decay.insert(metric.clone());
        }

        per_metric.insert(
            metric.clone(),
            PerformanceComparison {
                baseline_value,
                current_value,
                decay,
                decay_ratio,
                exceeded,
            },
        );
    }

    DecayResult {
        decay_detected: !metrics_with_decay.is_empty(),
        metrics_with_decay,
        per_metric,
        threshold,
        timestamp: Utc::now(),
    }
}
