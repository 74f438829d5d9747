//! Error types for the ingestion crate.

use climatology::ClimatologyError;
use grid_locator::LocatorError;
use thiserror::Error;

use crate::fetcher::FetchError;

/// Errors that abort a whole query.
///
/// Single timesteps that fail to fetch or decode never surface here; they
/// are counted in the [`FetchReport`](crate::FetchReport) instead.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Location rejected: {0}")]
    Locator(#[from] LocatorError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Climatology failed: {0}")]
    Climatology(#[from] ClimatologyError),

    #[error("No timestep succeeded out of {requested} requested")]
    NoTimesteps { requested: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
