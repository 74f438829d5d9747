//! Exceedance probabilities for a target date from a point dataset.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use gldas_common::variables::{AIR_TEMPERATURE, PRECIPITATION_RATE, RELATIVE_HUMIDITY};
use serde::{Deserialize, Serialize};
use timeseries::{TimeSeriesPoint, WeatherDataset};
use tracing::{debug, info, instrument};

use crate::conditions::{Condition, ConditionSource, ProbabilityThresholds};
use crate::confidence::{confidence_for, wald_interval, ConfidenceInterval};
use crate::context::{historical_context, HistoricalContext};
use crate::error::{ClimatologyError, ClimatologyResult};
use crate::heat_index::heat_index_series;
use crate::seasonal::{SeasonalWindow, DEFAULT_HALF_WINDOW_DAYS};
use crate::stats::percentile_sorted;

/// Probability and confidence of one condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    /// Share of seasonal samples meeting the threshold, rounded to whole %.
    pub probability: u32,
    pub confidence: u32,
    pub threshold: f64,
    pub occurrences: usize,
    pub sample_size: usize,
}

/// Outcome per condition. No samples is never reported as 0 %.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConditionOutcome {
    Available(ConditionResult),
    InsufficientData,
}

impl ConditionOutcome {
    pub fn result(&self) -> Option<&ConditionResult> {
        match self {
            ConditionOutcome::Available(result) => Some(result),
            ConditionOutcome::InsufficientData => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ConditionOutcome::Available(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Percentage of requested timesteps that arrived.
    pub completeness: f64,
    /// Mean confidence of the available conditions.
    pub reliability: f64,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityResults {
    pub latitude: f64,
    pub longitude: f64,
    pub target_date: NaiveDate,
    pub conditions: BTreeMap<Condition, ConditionOutcome>,
    pub thresholds: ProbabilityThresholds,
    pub confidence_intervals: BTreeMap<Condition, ConfidenceInterval>,
    pub historical_context: HistoricalContext,
    pub data_quality: DataQuality,
    pub generated_at: DateTime<Utc>,
}

impl ProbabilityResults {
    pub fn outcome(&self, condition: Condition) -> ConditionOutcome {
        self.conditions
            .get(&condition)
            .copied()
            .unwrap_or(ConditionOutcome::InsufficientData)
    }
}

/// Seasonal samples of one condition, sorted ascending by value.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalSamples {
    pub condition: Condition,
    pub values: Vec<f64>,
}

impl SeasonalSamples {
    fn new(condition: Condition, points: &[TimeSeriesPoint]) -> Self {
        let mut values: Vec<f64> = points
            .iter()
            .map(|p| p.value)
            .filter(|v| v.is_finite())
            .collect();
        values.sort_by(f64::total_cmp);
        Self { condition, values }
    }

    /// Threshold and result, or `InsufficientData` when empty.
    pub fn evaluate(&self) -> ConditionOutcome {
        if self.values.is_empty() {
            return ConditionOutcome::InsufficientData;
        }

        let threshold = percentile_sorted(&self.values, self.condition.percentile());
        let exceedance = self.condition.exceedance();
        let occurrences = self
            .values
            .iter()
            .filter(|v| exceedance.occurs(**v, threshold))
            .count();
        let sample_size = self.values.len();

        ConditionOutcome::Available(ConditionResult {
            probability: (occurrences as f64 / sample_size as f64 * 100.0).round() as u32,
            confidence: confidence_for(sample_size),
            threshold,
            occurrences,
            sample_size,
        })
    }
}

/// Computes [`ProbabilityResults`] from a [`WeatherDataset`].
///
/// Pure: the dataset is only read, and equal inputs give equal results
/// apart from `generated_at`.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityEngine {
    half_window_days: u32,
}

impl Default for ProbabilityEngine {
    fn default() -> Self {
        Self::new(DEFAULT_HALF_WINDOW_DAYS)
    }
}

impl ProbabilityEngine {
    pub fn new(half_window_days: u32) -> Self {
        Self { half_window_days }
    }

    pub fn half_window_days(&self) -> u32 {
        self.half_window_days
    }

    pub fn window(&self, target: NaiveDate) -> SeasonalWindow {
        SeasonalWindow::new(target, self.half_window_days)
    }

    /// Seasonal samples for one condition.
    pub fn seasonal_samples(
        &self,
        dataset: &WeatherDataset,
        condition: Condition,
        target: NaiveDate,
    ) -> SeasonalSamples {
        let window = self.window(target);
        let points = match condition.source() {
            ConditionSource::Variable(variable) => window.extract(dataset.series(variable)),
            ConditionSource::HeatIndex => {
                let temperature = window.extract(dataset.series(AIR_TEMPERATURE));
                heat_index_series(&temperature, dataset.series(RELATIVE_HUMIDITY))
            }
        };
        SeasonalSamples::new(condition, &points)
    }

    /// Evaluate every condition for `target_date`.
    ///
    /// `completeness` is the fraction (0..=1) of requested timesteps the
    /// fetch layer delivered. Fails with `InsufficientData` only when no
    /// condition has a single seasonal sample.
    #[instrument(skip(self, dataset), fields(lat = dataset.latitude(), lon = dataset.longitude()))]
    pub fn analyze(
        &self,
        dataset: &WeatherDataset,
        target_date: NaiveDate,
        completeness: f64,
    ) -> ClimatologyResult<ProbabilityResults> {
        let mut conditions = BTreeMap::new();
        let mut thresholds = ProbabilityThresholds::default();
        let mut confidence_intervals = BTreeMap::new();

        for condition in Condition::ALL {
            let samples = self.seasonal_samples(dataset, condition, target_date);
            let outcome = samples.evaluate();
            match outcome.result() {
                Some(result) => {
                    thresholds.set(condition, result.threshold);
                    if let Some(ci) = wald_interval(result.occurrences, result.sample_size) {
                        confidence_intervals.insert(condition, ci);
                    }
                    debug!(
                        condition = %condition,
                        threshold = result.threshold,
                        occurrences = result.occurrences,
                        samples = result.sample_size,
                        "Evaluated condition"
                    );
                }
                None => debug!(condition = %condition, "No seasonal samples"),
            }
            conditions.insert(condition, outcome);
        }

        let available: Vec<&ConditionResult> =
            conditions.values().filter_map(ConditionOutcome::result).collect();
        if available.is_empty() {
            return Err(ClimatologyError::InsufficientData {
                target: target_date,
                half_window_days: self.half_window_days,
            });
        }

        let reliability = available.iter().map(|r| r.confidence as f64).sum::<f64>()
            / available.len() as f64;

        let window = self.window(target_date);
        let historical_context = historical_context(
            &window.extract(dataset.series(AIR_TEMPERATURE)),
            &window.extract(dataset.series(PRECIPITATION_RATE)),
            target_date.ordinal(),
        );

        info!(
            target_date = %target_date,
            available = available.len(),
            reliability = reliability,
            "Computed climatology"
        );

        Ok(ProbabilityResults {
            latitude: dataset.latitude(),
            longitude: dataset.longitude(),
            target_date,
            conditions,
            thresholds,
            confidence_intervals,
            historical_context,
            data_quality: DataQuality {
                completeness: completeness.clamp(0.0, 1.0) * 100.0,
                reliability,
                sources: dataset.sources().iter().cloned().collect(),
            },
            generated_at: Utc::now(),
        })
    }
}
