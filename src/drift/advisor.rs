//! Retraining recommendation from drift and decay results.

use serde::{Deserialize, Serialize};

use crate::drift::decay::DecayResult;
use crate::drift::detector::DriftResult;
use crate::drift::{Severity, Urgency};

/// Decay ratio above which retraining is immediate.
pub const SEVERE_DECAY_RATIO: f64 = 0.15;

pub const ACTION_CONTINUE: &str = "Continue monitoring";
pub const ACTION_RETRAIN_NOW: &str = "Retrain immediately (within 1-2 days)";
pub const ACTION_SCHEDULE: &str = "Schedule retraining (within 1 week)";
pub const ACTION_MONITOR: &str = "Monitor closely, consider retraining if persists";
pub const ACTION_RETRAIN_DECAY: &str = "Retrain immediately";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub should_retrain: bool,
    pub urgency: Urgency,
    pub reasons: Vec<String>,
    pub action: String,
}

impl Default for Recommendation {
    fn default() -> Self {
        Self {
            should_retrain: false,
            urgency: Urgency::None,
            reasons: Vec::new(),
            action: ACTION_CONTINUE.to_string(),
        }
    }
}

/// Combine a drift result and an optional decay result into one recommendation.
///
/// Reasons accumulate in rule order; urgency only ever goes up.
pub fn recommend(drift: &DriftResult, decay: Option<&DecayResult>) -> Recommendation {
    let mut rec = Recommendation::default();
    let drifted = drift.features_with_drift.len();

    match drift.severity {
        Severity::High => {
            rec.should_retrain = true;
            rec.urgency = rec.urgency.max(Urgency::Urgent);
            rec.reasons
                .push(format!("High drift detected in {} features", drifted));
            rec.action = ACTION_RETRAIN_NOW.to_string();
        }
        Severity::Moderate => {
            rec.should_retrain = true;
            rec.urgency = rec.urgency.max(Urgency::Medium);
            rec.reasons
                .push(format!("Moderate drift detected in {} features", drifted));
            rec.action = ACTION_SCHEDULE.to_string();
        }
        Severity::Low => {
            rec.urgency = rec.urgency.max(Urgency::Low);
            rec.reasons
                .push(format!("Low drift detected in {} features", drifted));
            rec.action = ACTION_MONITOR.to_string();
        }
        Severity::None => {}
    }

    if let Some(decay) = decay.filter(|d| d.decay_detected) {
        rec.should_retrain = true;
        let max_decay = decay.max_decay_ratio().unwrap_or(0.0);

        if max_decay > SEVERE_DECAY_RATIO {
            rec.urgency = Urgency::Urgent;
            rec.reasons.push(format!(
                "Severe performance decay detected (>{:.1}%)",
                max_decay * 100.0
            ));
            rec.action = ACTION_RETRAIN_DECAY.to_string();
        } else {
            rec.urgency = rec.urgency.max(Urgency::Medium);
            rec.reasons.push(format!(
                "Performance decay detected (>{:.1}%)",
                max_decay * 100.0
            ));
            if rec.action == ACTION_CONTINUE {
                rec.action = ACTION_SCHEDULE.to_string();
            }
        }
    }

    rec
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::{BTreeMap, BTreeSet};

    use crate::drift::decay::PerformanceComparison;

    fn drift_with(severity: Severity, drifted: usize) -> DriftResult {
        DriftResult {
            drift_detected: drifted > 0,
            features_with_drift: (0..drifted).map(|i| format!("f{}", i)).collect(),
            per_feature: BTreeMap::new(),
            features_considered: 6,
            drift_ratio: drifted as f64 / 6.0,
            severity,
            strategy: "moment_shift".to_string(),
            threshold: 0.5,
            timestamp: Utc.with_ymd_and_hms(2025, 11, 15, 12, 0, 0).unwrap(),
        }
    }

    fn decay_with(ratios: &[f64], threshold: f64) -> DecayResult {
        let per_metric: BTreeMap<String, PerformanceComparison> = ratios
            .iter()
            .enumerate()
            .map(|(i, r)| {
                (
                    format!("m{}", i),
                    PerformanceComparison {
                        baseline_value: 1.0,
                        current_value: 1.0 - r,
                        decay: *r,
                        decay_ratio: *r,
                        exceeded: *r > threshold,
                    },
                )
            })
            .collect();
        let metrics_with_decay: BTreeSet<String> = per_metric
            .iter()
            .filter(|(_, c)| c.exceeded)
            .map(|(k, _)| k.clone())
            .collect();
        DecayResult {
            decay_detected: !metrics_with_decay.is_empty(),
            metrics_with_decay,
            per_metric,
            threshold,
            timestamp: Utc.with_ymd_and_hms(2025, 11, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_quiet_inputs_continue_monitoring() {
        let rec = recommend(&drift_with(Severity::None, 0), None);
        assert_eq!(rec, Recommendation::default());
        assert_eq!(rec.action, "Continue monitoring");
    }

    #[test]
    fn test_high_drift() {
        let rec = recommend(&drift_with(Severity::High, 3), None);
        assert!(rec.should_retrain);
        assert_eq!(rec.urgency, Urgency::Urgent);
        assert_eq!(rec.reasons, vec!["High drift detected in 3 features"]);
        assert_eq!(rec.action, "Retrain immediately (within 1-2 days)");
    }

    #[test]
    fn test_moderate_drift_without_decay() {
        let rec = recommend(&drift_with(Severity::Moderate, 2), None);
        assert!(rec.should_retrain);
        assert_eq!(rec.urgency, Urgency::Medium);
        assert_eq!(rec.action, "Schedule retraining (within 1 week)");
    }

    #[test]
    fn test_low_drift_alone_does_not_retrain() {
        let rec = recommend(&drift_with(Severity::Low, 1), None);
        assert!(!rec.should_retrain);
        assert_eq!(rec.urgency, Urgency::Low);
        assert_eq!(rec.action, "Monitor closely, consider retraining if persists");
    }

    #[test]
    fn test_severe_decay_overrides_action() {
        let decay = decay_with(&[0.20, 0.05], 0.10);
        let rec = recommend(&drift_with(Severity::None, 0), Some(&decay));
        assert!(rec.should_retrain);
        assert_eq!(rec.urgency, Urgency::Urgent);
        assert_eq!(rec.reasons, vec!["Severe performance decay detected (>20.0%)"]);
        assert_eq!(rec.action, "Retrain immediately");
    }

    #[test]
    fn test_mild_decay_raises_quiet_urgency() {
        let decay = decay_with(&[0.12], 0.10);
        let rec = recommend(&drift_with(Severity::None, 0), Some(&decay));
        assert!(rec.should_retrain);
        assert_eq!(rec.urgency, Urgency::Medium);
        assert_eq!(rec.reasons, vec!["Performance decay detected (>12.0%)"]);
        assert_eq!(rec.action, "Schedule retraining (within 1 week)");
    }

    #[test]
    fn test_mild_decay_never_lowers_urgency() {
        let decay = decay_with(&[0.12], 0.10);
        let rec = recommend(&drift_with(Severity::High, 4), Some(&decay));
        assert_eq!(rec.urgency, Urgency::Urgent);
        assert_eq!(rec.action, "Retrain immediately (within 1-2 days)");
        assert_eq!(
            rec.reasons,
            vec![
                "High drift detected in 4 features",
                "Performance decay detected (>12.0%)"
            ]
        );
    }

    #[test]
    fn test_low_drift_with_mild_decay_raises_to_medium() {
        let decay = decay_with(&[0.11], 0.10);
        let rec = recommend(&drift_with(Severity::Low, 1), Some(&decay));
        assert!(rec.should_retrain);
        assert_eq!(rec.urgency, Urgency::Medium);
        assert_eq!(rec.action, "Monitor closely, consider retraining if persists");
        assert_eq!(rec.reasons.len(), 2);
    }

    #[test]
    fn test_undetected_decay_is_ignored() {
        let decay = decay_with(&[0.05], 0.10);
        let rec = recommend(&drift_with(Severity::None, 0), Some(&decay));
        assert_eq!(rec, Recommendation::default());
    }

    #[test]
    fn test_recommend_is_idempotent() {
        let drift = drift_with(Severity::Moderate, 2);
        let decay = decay_with(&[0.30], 0.10);
        let a = serde_json::to_vec(&recommend(&drift, Some(&decay))).unwrap();
        let b = serde_json::to_vec(&recommend(&drift, Some(&decay))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_urgency_monotonic_in_severity() {
        let mut last = Urgency::None;
        for sev in [Severity::None, Severity::Low, Severity::Moderate, Severity::High] {
            let rec = recommend(&drift_with(sev, 1), None);
            assert!(rec.urgency >= last);
            last = rec.urgency;
        }
    }

    #[test]
    fn test_urgency_monotonic_in_severity_with_mild_decay() {
        let decay = decay_with(&[0.12], 0.10);
        let mut last = Urgency::None;
        for sev in [Severity::None, Severity::Low, Severity::Moderate, Severity::High] {
            let rec = recommend(&drift_with(sev, 1), Some(&decay));
            assert!(rec.urgency >= last, "urgency dropped at {}", sev);
            assert!(rec.urgency >= Urgency::Medium);
            last = rec.urgency;
        }
    }
}
