//! GLDAS point climatology analyzer.
//!
//! Fetches the seasonal history of one location through an OPeNDAP relay,
//! assembles the time series and prints exceedance probabilities as JSON.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use climatology::{ProbabilityEngine, ProbabilityResults};
use gldas_common::parse_date;
use ingestion::{AnalysisCache, AnalysisQuery, FetchPool, FetchReport, HttpFetcher, Pipeline};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::AnalyzerConfig;

#[derive(Parser, Debug)]
#[command(name = "gldas-analyzer")]
#[command(about = "Climatological exceedance probabilities for one location")]
struct Args {
    /// Latitude in degrees north
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude in degrees east
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Calendar date to analyze (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    target: NaiveDate,

    /// First day of history (default: derived from analysis.history_years)
    #[arg(long, value_parser = parse_date_arg)]
    start: Option<NaiveDate>,

    /// Last day of history
    #[arg(long, value_parser = parse_date_arg)]
    end: Option<NaiveDate>,

    /// YAML configuration file
    #[arg(long, env = "GLDAS_CONFIG")]
    config: Option<PathBuf>,

    /// Relay base URL, overrides the config file
    #[arg(long, env = "GLDAS_RELAY_URL")]
    relay_url: Option<String>,

    /// Relay token, overrides the config file
    #[arg(long, env = "GLDAS_RELAY_TOKEN", hide_env_values = true)]
    relay_token: Option<String>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

/// What the analyzer prints.
#[derive(Debug, Serialize)]
struct AnalysisReport<'a> {
    query: &'a AnalysisQuery,
    dataset_key: Option<String>,
    fetch: FetchReport,
    cached: bool,
    results: &'a ProbabilityResults,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so stdout stays valid JSON
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if args.log_json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let mut config = match &args.config {
        Some(path) => AnalyzerConfig::load(path)?,
        None => AnalyzerConfig::default(),
    };
    if let Some(url) = &args.relay_url {
        config.relay.base_url = url.clone();
    }
    if let Some(token) = &args.relay_token {
        config.relay.token = Some(token.clone());
    }
    config.validate().context("Invalid analyzer configuration")?;

    let (start_date, end_date) = match (args.start, args.end) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let (default_start, default_end) = config.history_range(args.target)?;
            (start.unwrap_or(default_start), end.unwrap_or(default_end))
        }
    };
    let query = AnalysisQuery {
        lat: args.lat,
        lon: args.lon,
        start_date,
        end_date,
        target_date: args.target,
    };

    info!(
        lat = query.lat,
        lon = query.lon,
        start = %query.start_date,
        end = %query.end_date,
        target_date = %query.target_date,
        "Starting GLDAS analysis"
    );

    let fetcher = HttpFetcher::new(config.fetcher_config())
        .context("Failed to build relay client")?;
    let pool = FetchPool::new(config.fetch.concurrency, config.timestep_timeout())
        .context("Invalid fetch settings")?;
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        ProbabilityEngine::new(config.analysis.half_window_days),
    )
    .with_pool(pool)
    .with_cache(AnalysisCache::new(config.analysis.cache_entries))
    .with_plan_mode(config.analysis.plan);

    // Handle Ctrl+C: stop launching fetches, analyze what arrived
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        warn!("Received shutdown signal, finishing with fetched timesteps");
        shutdown_tx.send(true).ok();
    });

    let outcome = pipeline
        .analyze(&query, shutdown_rx)
        .await
        .context("Analysis failed")?;

    let report = AnalysisReport {
        query: &query,
        dataset_key: outcome.dataset_key.as_ref().map(|k| k.storage_key()),
        fetch: outcome.report,
        cached: outcome.cached,
        results: &outcome.results,
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", json),
    }

    info!(
        succeeded = outcome.report.succeeded,
        missing = outcome.report.missing(),
        completeness = outcome.results.data_quality.completeness,
        reliability = outcome.results.data_quality.reliability,
        "Analysis complete"
    );

    Ok(())
}
