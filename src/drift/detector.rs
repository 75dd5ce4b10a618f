use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::baseline::Baseline;
use crate::drift::ks;
use crate::drift::stats::Sample;
use crate::drift::{DriftError, Severity};
use crate::observations::{ObservationBatch, ReferenceSamples};

/// Default relative shift (in baseline standard deviations) for the moment strategy.
pub const MOMENT_SHIFT_THRESHOLD: f64 = 0.5;
/// Default p-value cut-off for the distribution test.
pub const DISTRIBUTION_TEST_THRESHOLD: f64 = 0.05;
/// Guards the division when a baseline feature has zero spread.
pub const STD_EPSILON: f64 = 1e-10;

/// How current observations are compared against the reference.
#[derive(Debug, Clone, Copy)]
pub enum DriftStrategy<'a> {
    /// Compare batch mean/std with the baseline summary statistics.
    MomentShift { threshold: f64 },
    /// Two-sample KS test against raw reference samples.
    DistributionTest {
        reference: &'a ReferenceSamples,
        threshold: f64,
    },
}

impl<'a> DriftStrategy<'a> {
    pub fn moment_shift() -> Self {
        DriftStrategy::MomentShift {
            threshold: MOMENT_SHIFT_THRESHOLD,
        }
    }

    pub fn distribution_test(reference: &'a ReferenceSamples) -> Self {
        DriftStrategy::DistributionTest {
            reference,
            threshold: DISTRIBUTION_TEST_THRESHOLD,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DriftStrategy::MomentShift { .. } => "moment_shift",
            DriftStrategy::DistributionTest { .. } => "distribution_test",
        }
    }

    pub fn threshold(&self) -> f64 {
        match self {
            DriftStrategy::MomentShift { threshold }
            | DriftStrategy::DistributionTest { threshold, .. } => *threshold,
        }
    }

    fn validate(&self, baseline: &Baseline) -> Result<(), DriftError> {
        match self {
            DriftStrategy::MomentShift { .. } => baseline.validate(),
            DriftStrategy::DistributionTest { reference, .. } => {
                if reference.is_empty() {
                    return Err(DriftError::InvalidBaseline(
                        "reference samples contain no rows".to_string(),
                    ));
                }
                if reference.feature_names().is_empty() {
                    return Err(DriftError::InvalidBaseline(
                        "reference samples contain no features".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Features the strategy has a reference for.
    fn reference_features<'b>(&'b self, baseline: &'b Baseline) -> Vec<&'b str> {
        match self {
            DriftStrategy::MomentShift { .. } => {
                baseline.feature_statistics.keys().map(String::as_str).collect()
            }
            DriftStrategy::DistributionTest { reference, .. } => {
                reference.feature_names().into_iter().collect()
            }
        }
    }

    /// Compare one feature. `None` means the feature is skipped.
    fn compute_drift_flag(
        &self,
        feature: &str,
        current: &[f64],
        baseline: &Baseline,
    ) -> Option<DriftStatistic> {
        if current.is_empty() {
            return None;
        }
        match *self {
            DriftStrategy::MomentShift { threshold } => {
                let stats = baseline.feature_statistics.get(feature)?;
                let sample = Sample::new(current.to_vec());
                let current_mean = sample.mean();
                let current_std = sample.std_dev();

                let scale = stats.std.abs() + STD_EPSILON;
                let mean_change_ratio = (current_mean - stats.mean).abs() / scale;
                let std_change_ratio = (current_std - stats.std).abs() / scale;

                Some(DriftStatistic::MomentShift {
                    baseline_mean: stats.mean,
                    current_mean,
                    mean_change_ratio,
                    baseline_std: stats.std,
                    current_std,
                    std_change_ratio,
                    drift_flag: mean_change_ratio > threshold || std_change_ratio > threshold,
                })
            }
            DriftStrategy::DistributionTest {
                reference,
                threshold,
            } => {
                let reference_values = reference.column(feature)?;
                let outcome = ks::two_sample(&reference_values, current)?;
                Some(DriftStatistic::DistributionTest {
                    ks_statistic: outcome.statistic,
                    p_value: outcome.p_value,
                    drift_flag: outcome.p_value < threshold,
                })
            }
        }
    }
}

/// Per-feature comparison detail. One shape per analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DriftStatistic {
    MomentShift {
        baseline_mean: f64,
        current_mean: f64,
        mean_change_ratio: f64,
        baseline_std: f64,
        current_std: f64,
        std_change_ratio: f64,
        drift_flag: bool,
    },
    DistributionTest {
        ks_statistic: f64,
        p_value: f64,
        drift_flag: bool,
    },
}

impl DriftStatistic {
    pub fn drift_flag(&self) -> bool {
        match self {
            DriftStatistic::MomentShift { drift_flag, .. }
            | DriftStatistic::DistributionTest { drift_flag, .. } => *drift_flag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    pub drift_detected: bool,
    pub features_with_drift: BTreeSet<String>,
    pub per_feature: BTreeMap<String, DriftStatistic>,
    /// Number of features actually compared (the severity denominator).
    pub features_considered: usize,
    pub drift_ratio: f64,
    pub severity: Severity,
    pub strategy: String,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

/// Compare a batch of observations against the reference selected by `strategy`.
///
/// Features missing from the batch, or with no non-missing values, are
/// skipped and do not count towards the drift ratio.
pub fn detect(
    observations: &ObservationBatch,
    baseline: &Baseline,
    strategy: DriftStrategy<'_>,
) -> Result<DriftResult, DriftError> {
    if observations.is_empty() {
        return Err(DriftError::EmptyObservationSet);
    }
    strategy.validate(baseline)?;

    let mut per_feature = BTreeMap::new();
    let mut features_with_drift = BTreeSet::new();

    for feature in strategy.reference_features(baseline) {
        let Some(current) = observations.column(feature) else {
            debug!(feature, "feature absent from batch, skipping");
            continue;
        };
        let Some(stat) = strategy.compute_drift_flag(feature, &current, baseline) else {
            debug!(feature, "no comparable values, skipping");
            continue;
        };
        if stat.drift_flag() {
            features_with_drift.insert(feature.to_string());
        }
        per_feature.insert(feature.to_string(), stat);
    }

    let features_considered = per_feature.len();
    let drift_ratio = if features_considered > 0 {
        features_with_drift.len() as f64 / features_considered as f64
    } else {
        0.0
    };
    let severity = Severity::from_ratio(drift_ratio);

    info!(
        strategy = strategy.name(),
        considered = features_considered,
        drifted = features_with_drift.len(),
        %severity,
        "drift analysis complete"
    );

    Ok(DriftResult {
        drift_detected: !features_with_drift.is_empty(),
        features_with_drift,
        per_feature,
        features_considered,
        drift_ratio,
        severity,
        strategy: strategy.name().to_string(),
        threshold: strategy.threshold(),
        timestamp: Utc::now(),
    })
}
