//! Seasonal climatology and exceedance probabilities for GLDAS point series.
//!
//! Given a [`timeseries::WeatherDataset`] and a target calendar date, the
//! [`ProbabilityEngine`] gathers every historical sample within a ±7 day
//! day-of-year window (wrapping across year ends), derives a percentile
//! threshold per [`Condition`], and reports the occurrence probability with
//! a sample-size confidence, a Wald interval and a historical summary.
//!
//! A condition without seasonal samples is reported as
//! [`ConditionOutcome::InsufficientData`], never as a 0 % probability.

pub mod conditions;
pub mod confidence;
pub mod context;
pub mod engine;
pub mod error;
pub mod heat_index;
pub mod seasonal;
pub mod stats;

pub use conditions::{Condition, ProbabilityThresholds};
pub use confidence::ConfidenceInterval;
pub use context::{ExtremeEvents, ExtremeRecord, HistoricalContext, YearlySummary};
pub use engine::{
    ConditionOutcome, ConditionResult, DataQuality, ProbabilityEngine, ProbabilityResults,
    SeasonalSamples,
};
pub use error::{ClimatologyError, ClimatologyResult};
pub use seasonal::{SeasonalWindow, DEFAULT_HALF_WINDOW_DAYS};
