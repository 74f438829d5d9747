//! Configuration loading for the analyzer.
//!
//! Loaded from a single YAML file; every section is optional.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use climatology::DEFAULT_HALF_WINDOW_DAYS;
use ingestion::{HttpFetcherConfig, PlanMode};
use opendap_parser::ContentKind;
use serde::Deserialize;
use tracing::debug;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Where and how timesteps are fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_content")]
    pub content: ContentKind,
    #[serde(default = "default_variables")]
    pub variables: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            content: default_content(),
            variables: default_variables(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_content() -> ContentKind {
    ContentKind::Ascii
}

fn default_variables() -> Vec<String> {
    gldas_common::variables::default_request_variables()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

/// Worker pool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-timestep timeout
    #[serde(default = "default_timestep_timeout")]
    pub timestep_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timestep_timeout_secs: default_timestep_timeout(),
        }
    }
}

fn default_concurrency() -> usize {
    ingestion::pool::DEFAULT_CONCURRENCY
}

fn default_timestep_timeout() -> u64 {
    ingestion::pool::DEFAULT_TIMESTEP_TIMEOUT.as_secs()
}

/// Engine and planning settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_half_window")]
    pub half_window_days: u32,
    /// Years of history before the target year when no range is given
    #[serde(default = "default_history_years")]
    pub history_years: u32,
    #[serde(default)]
    pub plan: PlanMode,
    #[serde(default = "default_cache_entries")]
    pub cache_entries: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            half_window_days: default_half_window(),
            history_years: default_history_years(),
            plan: PlanMode::default(),
            cache_entries: default_cache_entries(),
        }
    }
}

fn default_half_window() -> u32 {
    DEFAULT_HALF_WINDOW_DAYS
}

fn default_history_years() -> u32 {
    10
}

fn default_cache_entries() -> usize {
    ingestion::cache::DEFAULT_CACHE_ENTRIES
}

impl AnalyzerConfig {
    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AnalyzerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(
            path = %path.display(),
            variables = config.relay.variables.len(),
            "Loaded analyzer config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.relay.base_url.trim().is_empty() {
            bail!("relay.base_url is required (config file or GLDAS_RELAY_URL)");
        }
        if self.relay.variables.is_empty() {
            bail!("relay.variables must name at least one variable");
        }
        if self.analysis.history_years == 0 {
            bail!("analysis.history_years must be at least 1");
        }
        Ok(())
    }

    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        let mut config =
            HttpFetcherConfig::new(self.relay.base_url.clone(), self.relay.variables.clone());
        config.kind = self.relay.content;
        config.request_timeout = Duration::from_secs(self.relay.request_timeout_secs);
        config.connect_timeout = Duration::from_secs(self.relay.connect_timeout_secs);
        config.relay_token = self.relay.token.clone();
        config
    }

    pub fn timestep_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timestep_timeout_secs)
    }

    /// Default history: the `history_years` full years before the target year.
    pub fn history_range(&self, target: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let last_year = target.year() - 1;
        let first_year = target.year() - self.analysis.history_years as i32;
        let start = NaiveDate::from_ymd_opt(first_year, 1, 1)
            .with_context(|| format!("No history start for year {}", first_year))?;
        let end = NaiveDate::from_ymd_opt(last_year, 12, 31)
            .with_context(|| format!("No history end for year {}", last_year))?;
        Ok((start, end))
    }
}
