//! Drift detection, performance decay and retraining advice.
//!
//! Everything in here is a pure computation over an injected [`Baseline`]
//! and an [`ObservationBatch`]; no module-level state, no I/O.
//!
//! [`Baseline`]: crate::baseline::Baseline
//! [`ObservationBatch`]: crate::observations::ObservationBatch

pub mod advisor;
pub mod decay;
pub mod detector;
pub mod ks;
pub mod stats;

pub use advisor::{recommend, Recommendation};
pub use decay::{detect_decay, DecayResult, PerformanceComparison};
pub use detector::{detect, DriftResult, DriftStatistic, DriftStrategy};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("invalid baseline: {0}")]
    InvalidBaseline(String),
    #[error("observation batch contains no rows")]
    EmptyObservationSet,
}

/// How much of the feature set drifted.
///
/// Variants are declared in ascending order so the derived `Ord` is the
/// severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
}

impl Severity {
    /// Grade a drifted/considered ratio.
    ///
    /// `0` is NONE, `(0, 0.2)` LOW, `[0.2, 0.5)` MODERATE, `>= 0.5` HIGH.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio <= 0.0 {
            Severity::None
        } else if ratio < 0.2 {
            Severity::Low
        } else if ratio < 0.5 {
            Severity::Moderate
        } else {
            Severity::High
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::None => write!(f, "NONE"),
            Severity::Low => write!(f, "LOW"),
            Severity::Moderate => write!(f, "MODERATE"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// How soon retraining should happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    None,
    Low,
    Medium,
    Urgent,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Urgency::None => write!(f, "NONE"),
            Urgency::Low => write!(f, "LOW"),
            Urgency::Medium => write!(f, "MEDIUM"),
            Urgency::Urgent => write!(f, "URGENT"),
        }
    }
}
