//! Fetching and end-to-end wiring for GLDAS point climatology.
//!
//! # Architecture
//!
//! - [`Fetcher`] abstracts the relay; [`HttpFetcher`] is the reqwest
//!   implementation building OPeNDAP subset URLs.
//! - [`FetchPool`] fetches and decodes timesteps with bounded concurrency,
//!   a per-timestep timeout and cooperative cancellation. Failed timesteps
//!   are holes counted in a [`FetchReport`].
//! - [`Pipeline`] plans requests, runs the pool, assembles the
//!   [`timeseries::WeatherDataset`] and hands it to the
//!   [`climatology::ProbabilityEngine`], memoizing results in an
//!   [`AnalysisCache`].

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod pipeline;
pub mod pool;

// Re-exports
pub use cache::{AnalysisCache, AnalysisCacheKey};
pub use error::{IngestionError, Result};
pub use fetcher::{FetchError, FetchedPayload, Fetcher};
pub use http::{HttpFetcher, HttpFetcherConfig};
pub use pipeline::{AnalysisOutcome, AnalysisQuery, FetchedDataset, Pipeline, PlanMode};
pub use pool::{DecodedTimestep, FetchPool, FetchReport, PoolOutput};
