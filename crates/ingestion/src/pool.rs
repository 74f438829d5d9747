//! Bounded concurrent fetch-and-decode of timestep requests.
//!
//! Every request is independent. A timestep that times out, fails to fetch
//! or decodes to nothing becomes a hole; the [`FetchReport`] says how many.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use grid_locator::RequestDescriptor;
use metrics::{counter, histogram};
use opendap_parser::{DecodeError, DecodedPayload, PayloadDecoder};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};
use crate::fetcher::{FetchError, Fetcher};

/// Default number of in-flight fetches.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default per-timestep timeout.
pub const DEFAULT_TIMESTEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Counts of what happened to each requested timestep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReport {
    pub requested: usize,
    pub succeeded: usize,
    pub timed_out: usize,
    pub failed: usize,
    pub empty: usize,
    pub cancelled: usize,
    /// Succeeded, but some variables could not be decoded.
    pub partial: usize,
}

impl FetchReport {
    pub fn missing(&self) -> usize {
        self.requested - self.succeeded
    }

    /// Fraction of requested timesteps without data, in [0, 1].
    pub fn missing_fraction(&self) -> f64 {
        if self.requested == 0 {
            return 0.0;
        }
        self.missing() as f64 / self.requested as f64
    }

    /// Fraction of requested timesteps that arrived, in [0, 1].
    pub fn completeness(&self) -> f64 {
        if self.requested == 0 {
            return 0.0;
        }
        1.0 - self.missing_fraction()
    }
}

/// A decoded timestep together with the request that produced it.
#[derive(Debug, Clone)]
pub struct DecodedTimestep {
    pub request: RequestDescriptor,
    pub payload: DecodedPayload,
}

/// Everything the pool gathered.
#[derive(Debug, Clone, Default)]
pub struct PoolOutput {
    /// Decoded timesteps in request order.
    pub timesteps: Vec<DecodedTimestep>,
    pub report: FetchReport,
}

enum Outcome {
    Decoded(DecodedPayload),
    TimedOut,
    Failed,
    Empty,
    Cancelled,
}

/// Pool settings.
#[derive(Debug, Clone)]
pub struct FetchPool {
    concurrency: usize,
    timeout: Duration,
    decoder: PayloadDecoder,
}

impl Default for FetchPool {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMESTEP_TIMEOUT,
            decoder: PayloadDecoder::default(),
        }
    }
}

impl FetchPool {
    pub fn new(concurrency: usize, timeout: Duration) -> Result<Self> {
        if concurrency == 0 {
            return Err(IngestionError::InvalidConfig(
                "fetch concurrency must be at least 1".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(IngestionError::InvalidConfig(
                "timestep timeout must be positive".to_string(),
            ));
        }
        Ok(Self {
            concurrency,
            timeout,
            decoder: PayloadDecoder::default(),
        })
    }

    pub fn with_decoder(mut self, decoder: PayloadDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch and decode every request with at most `concurrency` in flight.
    ///
    /// Once `shutdown` reads `true` no new fetch starts and in-flight ones
    /// are abandoned as cancelled. Timesteps already decoded are kept.
    pub async fn run(
        &self,
        fetcher: &dyn Fetcher,
        requests: &[RequestDescriptor],
        shutdown: watch::Receiver<bool>,
    ) -> PoolOutput {
        let started = Instant::now();
        let launch_guard = shutdown.clone();

        let mut results: Vec<(usize, Outcome)> = stream::iter(requests.iter().enumerate())
            .take_while(|_| {
                let cancelled = *launch_guard.borrow();
                async move { !cancelled }
            })
            .map(|(index, request)| {
                let shutdown = shutdown.clone();
                async move { (index, self.fetch_one(fetcher, request, shutdown).await) }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        // Merge single-threaded, in request order
        results.sort_by_key(|(index, _)| *index);

        let mut report = FetchReport {
            requested: requests.len(),
            ..FetchReport::default()
        };
        let mut timesteps = Vec::with_capacity(results.len());
        for (index, outcome) in results {
            match outcome {
                Outcome::Decoded(payload) => {
                    report.succeeded += 1;
                    if payload.is_partial() {
                        report.partial += 1;
                    }
                    timesteps.push(DecodedTimestep {
                        request: requests[index].clone(),
                        payload,
                    });
                }
                Outcome::TimedOut => report.timed_out += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Empty => report.empty += 1,
                Outcome::Cancelled => report.cancelled += 1,
            }
        }
        // Requests never launched after shutdown
        report.cancelled += report.requested
            - (report.succeeded + report.timed_out + report.failed + report.empty + report.cancelled);

        histogram!("gldas_fetch_batch_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        info!(
            requested = report.requested,
            succeeded = report.succeeded,
            missing = report.missing(),
            missing_fraction = report.missing_fraction(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetch batch complete"
        );

        PoolOutput { timesteps, report }
    }

    async fn fetch_one(
        &self,
        fetcher: &dyn Fetcher,
        request: &RequestDescriptor,
        mut shutdown: watch::Receiver<bool>,
    ) -> Outcome {
        let fetched = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => Err(FetchError::Cancelled),
            result = tokio::time::timeout(self.timeout, fetcher.fetch(request)) => {
                result.unwrap_or(Err(FetchError::Timeout(self.timeout)))
            }
        };

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(FetchError::Cancelled) => {
                counter!("gldas_fetch_total", "outcome" => "cancelled").increment(1);
                return Outcome::Cancelled;
            }
            Err(FetchError::Timeout(after)) => {
                counter!("gldas_fetch_total", "outcome" => "timeout").increment(1);
                warn!(granule = %request.granule, timeout_ms = after.as_millis() as u64, "Timestep timed out");
                return Outcome::TimedOut;
            }
            Err(e) => {
                counter!("gldas_fetch_total", "outcome" => "error").increment(1);
                warn!(granule = %request.granule, error = %e, "Timestep fetch failed");
                return Outcome::Failed;
            }
        };

        let decode_started = Instant::now();
        let decoded = self
            .decoder
            .decode(&fetched.bytes, fetched.kind, Some(request));
        histogram!("gldas_decode_duration_ms")
            .record(decode_started.elapsed().as_secs_f64() * 1000.0);

        match decoded {
            Ok(payload) => {
                counter!("gldas_fetch_total", "outcome" => "ok").increment(1);
                if payload.is_partial() {
                    warn!(
                        granule = %request.granule,
                        failed = ?payload.failed_variables,
                        "Some variables could not be decoded"
                    );
                }
                debug!(
                    granule = %request.granule,
                    samples = payload.samples.len(),
                    bytes = fetched.bytes.len(),
                    "Decoded timestep"
                );
                Outcome::Decoded(payload)
            }
            Err(DecodeError::EmptyResponse(reason)) => {
                counter!("gldas_fetch_total", "outcome" => "empty").increment(1);
                debug!(granule = %request.granule, reason = %reason, "Empty timestep");
                Outcome::Empty
            }
            Err(e) => {
                counter!("gldas_fetch_total", "outcome" => "undecodable").increment(1);
                warn!(
                    granule = %request.granule,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Timestep could not be decoded"
                );
                Outcome::Failed
            }
        }
    }
}

/// Resolves once the flag reads `true`; never if the sender goes away first.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_fractions() {
        let report = FetchReport {
            requested: 8,
            succeeded: 6,
            timed_out: 1,
            failed: 1,
            ..FetchReport::default()
        };
        assert_eq!(report.missing(), 2);
        assert_eq!(report.missing_fraction(), 0.25);
        assert_eq!(report.completeness(), 0.75);
        assert_eq!(FetchReport::default().missing_fraction(), 0.0);
    }

    #[test]
    fn test_pool_validation() {
        assert!(FetchPool::new(0, Duration::from_secs(1)).is_err());
        assert!(FetchPool::new(4, Duration::ZERO).is_err());
        let pool = FetchPool::new(4, Duration::from_millis(50)).unwrap();
        assert_eq!(pool.concurrency(), 4);
    }
}
