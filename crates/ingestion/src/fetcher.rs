//! Fetcher abstraction over the relay that serves GLDAS subsets.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use grid_locator::RequestDescriptor;
use opendap_parser::ContentKind;
use thiserror::Error;

/// Raw payload for one timestep.
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub bytes: Bytes,
    pub kind: ContentKind,
}

impl FetchedPayload {
    pub fn new(bytes: impl Into<Bytes>, kind: ContentKind) -> Self {
        Self {
            bytes: bytes.into(),
            kind,
        }
    }
}

/// Failure to obtain one timestep. Always recoverable by omission.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Relay returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Fetch cancelled")]
    Cancelled,
}

/// Source of per-timestep payloads.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the subset described by `request`.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<FetchedPayload, FetchError>;
}
