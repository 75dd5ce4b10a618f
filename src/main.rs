use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use urlytics::config::{LoggingConfig, MonitorConfig, SinkKind, StrategyKind};
use urlytics::drift::DriftStatistic;
use urlytics::report::DriftReport;

#[derive(Parser)]
#[command(
    name = "urlytics",
    about = "Phishing URL feature extraction and model drift monitoring",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a batch of production features against the training baseline
    Check {
        /// Baseline statistics JSON (defaults to baseline.path from config)
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Feature rows: JSON array or JSON lines
        #[arg(long, conflicts_with = "urls")]
        observations: Option<PathBuf>,

        /// Raw URLs, one per line; features are extracted before comparison
        #[arg(long)]
        urls: Option<PathBuf>,

        /// Current performance metrics as a flat JSON object
        #[arg(long)]
        metrics: Option<PathBuf>,

        /// Drift estimator
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Raw training samples for the ks strategy
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Drift threshold (relative shift for moment, p-value for ks)
        #[arg(long)]
        threshold: Option<f64>,

        /// Relative decay tolerated per metric
        #[arg(long)]
        decay_threshold: Option<f64>,

        /// Where the report goes
        #[arg(long, value_enum)]
        sink: Option<SinkArg>,

        /// Output file for the json sink
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract classifier features from one or more URLs
    Extract {
        /// URLs to analyze
        #[arg(required = true)]
        urls: Vec<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Derive a baseline from a reference batch of feature rows
    Baseline {
        /// Reference feature rows (usually the training set)
        #[arg(long)]
        reference: PathBuf,

        /// Training-time performance metrics as a flat JSON object
        #[arg(long)]
        metrics: Option<PathBuf>,

        /// Output file
        #[arg(long, default_value = "baseline_statistics.json")]
        output: PathBuf,
    },

    /// Show recent reports stored by the sqlite sink
    History {
        /// Number of reports to show
        #[arg(long, default_value = "10")]
        limit: usize,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Relative mean/std shift against baseline summary statistics
    Moment,
    /// Two-sample Kolmogorov-Smirnov test against reference samples
    Ks,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Moment => StrategyKind::MomentShift,
            StrategyArg::Ks => StrategyKind::DistributionTest,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SinkArg {
    Json,
    Sqlite,
}

impl From<SinkArg> for SinkKind {
    fn from(arg: SinkArg) -> Self {
        match arg {
            SinkArg::Json => SinkKind::Json,
            SinkArg::Sqlite => SinkKind::Sqlite,
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    // Logs go to stderr so stdout stays clean for --json output.
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The logging section lives in the config itself, so config loading runs
    // under a stderr bootstrap subscriber.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();
    let cfg = tracing::subscriber::with_default(bootstrap, || {
        MonitorConfig::resolve(cli.config.as_deref())
    })?;
    init_tracing(&cfg.logging);

    match cli.command {
        Commands::Check {
            baseline,
            observations,
            urls,
            metrics,
            strategy,
            reference,
            threshold,
            decay_threshold,
            sink,
            output,
            json,
        } => {
            let opts = urlytics::CheckOptions {
                baseline,
                observations,
                urls,
                metrics,
                strategy: strategy.map(StrategyKind::from),
                reference,
                threshold,
                decay_threshold,
                sink: sink.map(SinkKind::from),
                output,
            };
            tracing::info!("Running drift check");
            let emission = urlytics::run_check(&cfg, &opts).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&emission.report)?);
            } else {
                print_report(&emission.report);
            }

            // The report is already printed; a failed write still fails the run.
            emission.write.context("drift report could not be persisted")?;
        }
        Commands::Extract { urls, json } => {
            let rows: Vec<_> = urls
                .iter()
                .map(|u| (u.as_str(), urlytics::features::extract(u)))
                .collect();

            if json {
                let out: Vec<_> = rows
                    .iter()
                    .map(|(url, f)| serde_json::json!({ "url": url, "features": f }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let names = urlytics::features::FEATURE_NAMES;
                for (url, features) in rows {
                    println!("\n{}", url);
                    for (name, value) in names.iter().zip(features.to_vector()) {
                        println!("  {:<20} {:>3}", name, value);
                    }
                }
                println!();
            }
        }
        Commands::Baseline {
            reference,
            metrics,
            output,
        } => {
            tracing::info!(reference = %reference.display(), "Deriving baseline");
            let batch = urlytics::observations::ObservationBatch::load(&reference)?;
            let performance = match metrics {
                Some(path) => urlytics::baseline::load_metrics(&path)?,
                None => Default::default(),
            };
            let baseline = urlytics::baseline::Baseline::from_batch(&batch, performance)?;
            baseline.save(&output)?;
            println!(
                "Baseline with {} feature(s) written to {}",
                baseline.feature_statistics.len(),
                output.display()
            );
        }
        Commands::History { limit, json } => {
            let pool = urlytics::storage::open_pool(&cfg.storage.db_path)?;
            let history = urlytics::storage::ReportHistory::new(pool);
            let list = history.list_recent(limit)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if list.is_empty() {
                println!("No reports found.");
            } else {
                println!(
                    "{:<25} | {:<9} | {:<7} | {:<7} | Action",
                    "Timestamp", "Severity", "Urgency", "Retrain"
                );
                println!("{:-<25}-|-{:-<9}-|-{:-<7}-|-{:-<7}-|-{:-<30}", "", "", "", "", "");
                for entry in list {
                    println!(
                        "{:<25} | {:<9} | {:<7} | {:<7} | {}",
                        entry.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        entry.severity.to_string(),
                        entry.urgency.to_string(),
                        entry.should_retrain,
                        entry.report.recommendation.action
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_report(report: &DriftReport) {
    let drift = &report.drift;
    println!("\n=== URLytics Drift Report ===");
    println!("Timestamp:  {}", report.timestamp.to_rfc3339());
    println!("Strategy:   {} (threshold {})", drift.strategy, drift.threshold);
    println!(
        "Drift:      {} ({} of {} features, severity {})",
        if drift.drift_detected { "DETECTED" } else { "none" },
        drift.features_with_drift.len(),
        drift.features_considered,
        drift.severity
    );

    println!("\n{:<20} | {:<7} | Detail", "Feature", "Drift");
    println!("{:-<20}-|-{:-<7}-|-{:-<40}", "", "", "");
    for (name, stat) in &drift.per_feature {
        let detail = match stat {
            DriftStatistic::MomentShift {
                current_mean,
                baseline_mean,
                mean_change_ratio,
                std_change_ratio,
                ..
            } => format!(
                "mean {:.3} vs {:.3}, mean shift {:.2}, std shift {:.2}",
                current_mean, baseline_mean, mean_change_ratio, std_change_ratio
            ),
            DriftStatistic::DistributionTest {
                ks_statistic,
                p_value,
                ..
            } => format!("D = {:.4}, p = {:.4}", ks_statistic, p_value),
        };
        let flag = if stat.drift_flag() { "YES" } else { "no" };
        println!("{:<20} | {:<7} | {}", name, flag, detail);
    }

    if let Some(decay) = &report.decay {
        println!("\n{:<20} | {:<8} | {:<8} | Decay", "Metric", "Baseline", "Current");
        println!("{:-<20}-|-{:-<8}-|-{:-<8}-|-{:-<12}", "", "", "", "");
        for (name, cmp) in &decay.per_metric {
            println!(
                "{:<20} | {:<8.4} | {:<8.4} | {:.1}%{}",
                name,
                cmp.baseline_value,
                cmp.current_value,
                cmp.decay_ratio * 100.0,
                if cmp.exceeded { " (over threshold)" } else { "" }
            );
        }
    }

    let rec = &report.recommendation;
    println!("\nRetrain:    {}", if rec.should_retrain { "YES" } else { "no" });
    println!("Urgency:    {}", rec.urgency);
    println!("Action:     {}", rec.action);
    if !rec.reasons.is_empty() {
        println!("\nReasons:");
        for reason in &rec.reasons {
            println!(" - {}", reason);
        }
    }
    println!("=============================\n");
}
