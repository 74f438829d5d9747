//! Error types for grid location and request planning.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias using LocatorError.
pub type LocatorResult<T> = Result<T, LocatorError>;

#[derive(Debug, Error, PartialEq)]
pub enum LocatorError {
    /// Location outside the grid's latitude coverage. Not retryable.
    #[error("Location ({lat}, {lon}) is outside grid coverage")]
    OutOfCoverage { lat: f64, lon: f64 },

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}
