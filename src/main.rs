mod batch;
mod config;
mod errors;
mod expectancy;
mod scoring;

use crate::batch::{process_batch, BatchReport};
use crate::config::{AppConfig, ScoringConfig};
use crate::scoring::SignalScorer;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;

/// Score trading signals into P_win and expectancy (R-multiples) per CSV row.
#[derive(Parser)]
#[command(name = "edgecalc", version)]
struct Cli {
    /// Input CSV with signal columns (see README for the expected header).
    input: PathBuf,

    /// Output CSV path; defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file overriding the signal weight/cap table.
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Minimum EV (in R) for a take_trade recommendation.
    #[arg(long)]
    threshold: Option<f64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(threshold) = cli.threshold {
        cfg.take_threshold = threshold;
    }

    let scoring_cfg = match &cli.weights {
        Some(path) => match ScoringConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("weights error: {e}");
                std::process::exit(1);
            }
        },
        None => ScoringConfig::default(),
    };

    // Weight-sum check fails here, before any row is touched.
    let scorer = match SignalScorer::new(scoring_cfg) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("scorer error: {e}");
            std::process::exit(1);
        }
    };

    let input = match File::open(&cli.input) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("cannot open {}: {e}", cli.input.display());
            std::process::exit(1);
        }
    };

    let result = match &cli.output {
        Some(path) => File::create(path)
            .map_err(|e| errors::EngineError::Io(format!("{}: {e}", path.display())))
            .and_then(|f| process_batch(&scorer, &cfg, input, f)),
        None => process_batch(&scorer, &cfg, input, std::io::stdout().lock()),
    };

    let report = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("batch failed: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = &cli.output {
        tracing::info!("results saved to {}", path.display());
    }
    print_summary(&report, cfg.take_threshold);

    // Per-row failures do not abort the batch, but a run where nothing
    // scored should not look like success.
    if report.rows_read > 0 && report.rows_scored == 0 {
        std::process::exit(1);
    }
}

fn print_summary(report: &BatchReport, take_threshold: f64) {
    tracing::info!(
        "rows analyzed: {} ({} skipped)",
        report.rows_read,
        report.skipped.len()
    );
    tracing::info!("rows with EV >= {take_threshold}R: {}", report.takes);
    if let (Some(ev), Some(p_win)) = (report.mean_ev(), report.mean_p_win()) {
        tracing::info!("average EV: {ev:.3}R");
        tracing::info!("average P_win: {p_win:.3}");
    }
}
