//! Error types for the probability engine.

use thiserror::Error;

/// Result type alias using ClimatologyError.
pub type ClimatologyResult<T> = Result<T, ClimatologyError>;

#[derive(Debug, Error, PartialEq)]
pub enum ClimatologyError {
    /// No condition had a single seasonal sample.
    #[error("Insufficient data: no seasonal samples within ±{half_window_days} days of {target}")]
    InsufficientData {
        target: chrono::NaiveDate,
        half_window_days: u32,
    },

    #[error("Invalid percentile {0}: must lie in [0, 100]")]
    InvalidPercentile(f64),

    #[error("Cannot compute a statistic over an empty sample set")]
    EmptySamples,
}
