//! TOML configuration for the drift monitor.
//!
//! Every section has defaults, so an empty file (or no file at all) is a
//! valid configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::drift::decay::DECAY_THRESHOLD;
use crate::drift::detector::{DISTRIBUTION_TEST_THRESHOLD, MOMENT_SHIFT_THRESHOLD};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "URLYTICS_CONFIG";
/// Config file picked up from the working directory.
pub const LOCAL_CONFIG: &str = "urlytics.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub drift: DriftConfig,
    #[serde(default)]
    pub decay: DecayConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MonitorConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded monitor configuration");
        Ok(config)
    }

    /// Resolve configuration, in order:
    /// 1. An explicit path (from `--config`). Failing to load it is an error.
    /// 2. The path in `URLYTICS_CONFIG`.
    /// 3. `./urlytics.toml`.
    /// 4. Compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "URLYTICS_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Baseline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Training-time statistics snapshot.
    pub path: PathBuf,
    /// Raw training samples for the distribution test, if available.
    pub reference_path: Option<PathBuf>,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("phishing_model_artefacts/baseline_statistics.json"),
            reference_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Drift
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MomentShift,
    DistributionTest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub strategy: StrategyKind,
    /// Relative shift, in baseline standard deviations.
    pub moment_threshold: f64,
    /// p-value below which a feature counts as drifted.
    pub ks_threshold: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::MomentShift,
            moment_threshold: MOMENT_SHIFT_THRESHOLD,
            ks_threshold: DISTRIBUTION_TEST_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Decay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub threshold: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            threshold: DECAY_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub sink: SinkKind,
    /// Destination for the JSON sink.
    pub output_path: PathBuf,
    pub write_timeout_sec: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Json,
            output_path: PathBuf::from("drift_report.json"),
            write_timeout_sec: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/urlytics.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.drift.strategy, StrategyKind::MomentShift);
        assert_eq!(cfg.drift.moment_threshold, 0.5);
        assert_eq!(cfg.drift.ks_threshold, 0.05);
        assert_eq!(cfg.decay.threshold, 0.10);
        assert_eq!(cfg.report.sink, SinkKind::Json);
        assert_eq!(cfg.report.output_path, PathBuf::from("drift_report.json"));
        assert!(cfg.baseline.reference_path.is_none());
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
    }

    #[test]
    fn test_parse_example_toml() {
        let toml_str = r#"
[baseline]
path = "/srv/model/baseline_statistics.json"
reference_path = "/srv/model/training_sample.jsonl"

[drift]
strategy = "distribution_test"
ks_threshold = 0.01

[decay]
threshold = 0.05

[report]
sink = "sqlite"
write_timeout_sec = 3

[storage]
db_path = "/var/lib/urlytics/reports.db"

[logging]
level = "debug"
json = true
"#;

        let cfg: MonitorConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.baseline.path, PathBuf::from("/srv/model/baseline_statistics.json"));
        assert_eq!(
            cfg.baseline.reference_path,
            Some(PathBuf::from("/srv/model/training_sample.jsonl"))
        );
        assert_eq!(cfg.drift.strategy, StrategyKind::DistributionTest);
        assert_eq!(cfg.drift.ks_threshold, 0.01);
        // Not set, stays default.
        assert_eq!(cfg.drift.moment_threshold, 0.5);
        assert_eq!(cfg.decay.threshold, 0.05);
        assert_eq!(cfg.report.sink, SinkKind::Sqlite);
        assert_eq!(cfg.report.write_timeout_sec, 3);
        assert_eq!(cfg.storage.db_path, PathBuf::from("/var/lib/urlytics/reports.db"));
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg: MonitorConfig = toml::from_str("").unwrap();
        let defaults = MonitorConfig::default();

        assert_eq!(cfg.baseline.path, defaults.baseline.path);
        assert_eq!(cfg.storage.db_path, defaults.storage.db_path);
        assert_eq!(cfg.report.write_timeout_sec, defaults.report.write_timeout_sec);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result: std::result::Result<MonitorConfig, _> =
            toml::from_str("[drift]\nstrategy = \"psi\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("urlytics.toml");
        std::fs::write(&path, "[report]\noutput_path = \"out/report.json\"\n").unwrap();

        let cfg = MonitorConfig::resolve(Some(&path)).unwrap();
        assert_eq!(cfg.report.output_path, PathBuf::from("out/report.json"));
    }

    #[test]
    fn test_explicit_missing_file_errors() {
        let result = MonitorConfig::resolve(Some(Path::new("/nonexistent/urlytics.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let cfg = MonitorConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let roundtripped: MonitorConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(cfg.drift.strategy, roundtripped.drift.strategy);
        assert_eq!(cfg.report.output_path, roundtripped.report.output_path);
    }
}
