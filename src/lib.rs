//! URLytics -- phishing URL features and model drift monitoring.
//!
//! This crate provides URL feature extraction for the phishing classifier,
//! drift and performance-decay detection against a training baseline,
//! retraining advice, and report persistence.

pub mod baseline;
pub mod config;
pub mod drift;
pub mod features;
pub mod observations;
pub mod report;
pub mod storage;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::config::{MonitorConfig, SinkKind, StrategyKind};
use crate::drift::DriftStrategy;
use crate::observations::ObservationBatch;
use crate::report::{Emission, JsonFileSink, ReportEmitter, ReportSink};

/// Per-run overrides for a drift check. `None` falls back to the config.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub baseline: Option<PathBuf>,
    /// Feature rows (JSON array or JSON lines).
    pub observations: Option<PathBuf>,
    /// Raw URLs, one per line; features are extracted on the fly.
    pub urls: Option<PathBuf>,
    pub metrics: Option<PathBuf>,
    pub strategy: Option<StrategyKind>,
    pub reference: Option<PathBuf>,
    pub threshold: Option<f64>,
    pub decay_threshold: Option<f64>,
    pub sink: Option<SinkKind>,
    pub output: Option<PathBuf>,
}

/// Run one analysis cycle: load inputs, detect drift and decay, emit a report.
///
/// Input errors (baseline, observations, metrics) fail the call. A failed
/// report write does not: it is carried in the returned [`Emission`].
pub async fn run_check(cfg: &MonitorConfig, opts: &CheckOptions) -> Result<Emission> {
    let baseline_path = opts.baseline.as_deref().unwrap_or(&cfg.baseline.path);
    let baseline = baseline::load_baseline(baseline_path)?;

    let observations = load_batch(opts)?;
    tracing::info!(rows = observations.len(), "observation batch ready");

    let kind = opts.strategy.unwrap_or(cfg.drift.strategy);
    let reference = match kind {
        StrategyKind::MomentShift => None,
        StrategyKind::DistributionTest => {
            let path = opts
                .reference
                .as_deref()
                .or(cfg.baseline.reference_path.as_deref())
                .context("the distribution test needs reference samples (--reference or baseline.reference_path)")?;
            Some(
                ObservationBatch::load(path)
                    .with_context(|| format!("failed to load reference samples: {}", path.display()))?,
            )
        }
    };

    let strategy = match &reference {
        None => DriftStrategy::MomentShift {
            threshold: opts.threshold.unwrap_or(cfg.drift.moment_threshold),
        },
        Some(reference) => DriftStrategy::DistributionTest {
            reference,
            threshold: opts.threshold.unwrap_or(cfg.drift.ks_threshold),
        },
    };

    let drift = drift::detect(&observations, &baseline, strategy)?;

    let decay = match &opts.metrics {
        Some(path) => {
            let current = baseline::load_metrics(path)?;
            let threshold = opts.decay_threshold.unwrap_or(cfg.decay.threshold);
            Some(drift::detect_decay(
                &current,
                &baseline.performance_baseline,
                threshold,
            ))
        }
        None => None,
    };

    let emitter = ReportEmitter::new(
        build_sink(cfg, opts)?,
        Duration::from_secs(cfg.report.write_timeout_sec),
    );
    tracing::info!(sink = emitter.sink_name(), "emitting drift report");
    Ok(emitter.emit(drift, decay).await)
}

fn load_batch(opts: &CheckOptions) -> Result<ObservationBatch> {
    match (&opts.observations, &opts.urls) {
        (Some(path), None) => Ok(ObservationBatch::load(path)?),
        (None, Some(path)) => load_url_batch(path),
        (Some(_), Some(_)) => bail!("pass either observations or urls, not both"),
        (None, None) => bail!("no observations given (use --observations or --urls)"),
    }
}

fn load_url_batch(path: &Path) -> Result<ObservationBatch> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read url list: {}", path.display()))?;
    let urls = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));
    Ok(ObservationBatch::from_urls(urls))
}

fn build_sink(cfg: &MonitorConfig, opts: &CheckOptions) -> Result<Box<dyn ReportSink>> {
    let sink: Box<dyn ReportSink> = match opts.sink.unwrap_or(cfg.report.sink) {
        SinkKind::Json => {
            let path = opts.output.clone().unwrap_or_else(|| cfg.report.output_path.clone());
            Box::new(JsonFileSink::new(path))
        }
        SinkKind::Sqlite => {
            let pool = storage::open_pool(&cfg.storage.db_path)?;
            Box::new(storage::ReportHistory::new(pool))
        }
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::{Severity, Urgency};

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_run_check_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        let baseline = write(
            dir.path(),
            "baseline.json",
            r#"{"feature_statistics": {"f1": {"mean": 10, "std": 2}, "f2": {"mean": 5, "std": 1}},
                "performance_baseline": {"test_accuracy": 0.95}}"#,
        );
        let observations = write(
            dir.path(),
            "rows.jsonl",
            "{\"f1\": 19, \"f2\": 4}\n{\"f1\": 20, \"f2\": 5}\n{\"f1\": 21, \"f2\": 6}\n",
        );
        let metrics = write(dir.path(), "metrics.json", r#"{"test_accuracy": 0.93}"#);
        let output = dir.path().join("out").join("report.json");

        let opts = CheckOptions {
            baseline: Some(baseline),
            observations: Some(observations),
            metrics: Some(metrics),
            output: Some(output.clone()),
            ..Default::default()
        };
        let emission = run_check(&MonitorConfig::default(), &opts).await.unwrap();

        assert!(emission.write.is_ok());
        assert_eq!(emission.report.drift.severity, Severity::High);
        assert_eq!(
            emission.report.drift.features_with_drift.iter().collect::<Vec<_>>(),
            vec!["f1"]
        );
        assert!(!emission.report.decay.as_ref().unwrap().decay_detected);
        assert_eq!(emission.report.recommendation.urgency, Urgency::Urgent);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_run_check_from_urls_with_distribution_test() {
        let dir = tempfile::TempDir::new().unwrap();
        let baseline = write(
            dir.path(),
            "baseline.json",
            r#"{"feature_statistics": {"SSLfinal_State": {"mean": 1, "std": 0}}}"#,
        );
        let reference = ObservationBatch::from_urls(
            (0..40).map(|i| format!("https://site{}.example/", i)),
        );
        let reference_path = write(
            dir.path(),
            "reference.json",
            &serde_json::to_string(&reference).unwrap(),
        );
        let urls: String = (0..40).map(|i| format!("http://login{}.example/\n", i)).collect();
        let urls_path = write(dir.path(), "urls.txt", &format!("# plain http\n{}", urls));

        let opts = CheckOptions {
            baseline: Some(baseline),
            urls: Some(urls_path),
            strategy: Some(StrategyKind::DistributionTest),
            reference: Some(reference_path),
            output: Some(dir.path().join("report.json")),
            ..Default::default()
        };
        let emission = run_check(&MonitorConfig::default(), &opts).await.unwrap();

        let drift = &emission.report.drift;
        assert_eq!(drift.strategy, "distribution_test");
        assert!(drift.features_with_drift.contains("SSLfinal_State"));
        assert!(!drift.features_with_drift.contains("having_At_Symbol"));
    }

    #[tokio::test]
    async fn test_distribution_test_requires_reference() {
        let dir = tempfile::TempDir::new().unwrap();
        let baseline = write(
            dir.path(),
            "baseline.json",
            r#"{"feature_statistics": {"f": {"mean": 0, "std": 1}}}"#,
        );
        let rows = write(dir.path(), "rows.json", r#"[{"f": 0}]"#);
        let opts = CheckOptions {
            baseline: Some(baseline),
            observations: Some(rows),
            strategy: Some(StrategyKind::DistributionTest),
            ..Default::default()
        };
        let err = run_check(&MonitorConfig::default(), &opts).await.unwrap_err();
        assert!(err.to_string().contains("reference samples"));
    }

    #[tokio::test]
    async fn test_missing_baseline_fails() {
        let opts = CheckOptions {
            baseline: Some(PathBuf::from("/nonexistent/baseline.json")),
            ..Default::default()
        };
        let err = run_check(&MonitorConfig::default(), &opts).await.unwrap_err();
        assert!(err.to_string().contains("baseline not found"));
    }
}
