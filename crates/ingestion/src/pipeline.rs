//! Plan → fetch → decode → assemble → analyze for one point query.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use climatology::{ProbabilityEngine, ProbabilityResults};
use gldas_common::{start_of_day, DatasetKey};
use grid_locator::{GeoPoint, LocatorError, RequestDescriptor, RequestPlanner};
use serde::{Deserialize, Serialize};
use timeseries::{Assembler, AssemblyInput, WeatherDataset};
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::cache::{AnalysisCache, AnalysisCacheKey};
use crate::error::{IngestionError, Result};
use crate::fetcher::Fetcher;
use crate::pool::{FetchPool, FetchReport};

/// One climatology request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisQuery {
    pub lat: f64,
    pub lon: f64,
    /// First day of the historical record to consider
    pub start_date: NaiveDate,
    /// Last day of the historical record to consider
    pub end_date: NaiveDate,
    /// Calendar date whose climatology is wanted
    pub target_date: NaiveDate,
}

impl AnalysisQuery {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Which timesteps of `[start_date, end_date]` are requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Only the seasonal window around the target date in each year.
    #[default]
    SeasonalWindows,
    /// Every timestep of the range.
    FullRange,
}

/// Dataset assembled for a query.
#[derive(Debug, Clone)]
pub struct FetchedDataset {
    pub dataset: WeatherDataset,
    pub key: Option<DatasetKey>,
    pub report: FetchReport,
}

/// Result of [`Pipeline::analyze`].
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub results: Arc<ProbabilityResults>,
    pub dataset_key: Option<DatasetKey>,
    pub report: FetchReport,
    /// Whether the results came from the cache.
    pub cached: bool,
}

/// Wires a [`Fetcher`] to the pure stages.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    engine: ProbabilityEngine,
    planner: RequestPlanner,
    pool: FetchPool,
    assembler: Assembler,
    cache: AnalysisCache,
    plan_mode: PlanMode,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, engine: ProbabilityEngine) -> Self {
        Self {
            fetcher,
            engine,
            planner: RequestPlanner::default(),
            pool: FetchPool::default(),
            assembler: Assembler::default(),
            cache: AnalysisCache::default(),
            plan_mode: PlanMode::default(),
        }
    }

    pub fn with_pool(mut self, pool: FetchPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_cache(mut self, cache: AnalysisCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_plan_mode(mut self, plan_mode: PlanMode) -> Self {
        self.plan_mode = plan_mode;
        self
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Timestep requests for `query`, chronological.
    pub fn plan(&self, query: &AnalysisQuery) -> Result<Vec<RequestDescriptor>> {
        let point = query.point();
        if query.start_date > query.end_date {
            return Err(LocatorError::InvalidDateRange {
                start: query.start_date,
                end: query.end_date,
            }
            .into());
        }

        let requests = match self.plan_mode {
            PlanMode::FullRange => self.planner.plan(point, query.start_date, query.end_date)?,
            PlanMode::SeasonalWindows => {
                // One extra year each side so windows crossing Jan 1 are covered
                let years: Vec<i32> =
                    (query.start_date.year() - 1..=query.end_date.year() + 1).collect();
                let first = start_of_day(query.start_date);
                let last = start_of_day(query.end_date) + chrono::Duration::days(1);
                self.planner
                    .plan_seasonal(
                        point,
                        query.target_date,
                        &years,
                        self.engine.half_window_days(),
                    )?
                    .into_iter()
                    .filter(|r| r.timestamp >= first && r.timestamp < last)
                    .collect()
            }
        };
        Ok(requests)
    }

    /// Fetch, decode and assemble the dataset for `query`.
    ///
    /// Fails with [`IngestionError::NoTimesteps`] when nothing arrived.
    #[instrument(skip(self, shutdown), fields(lat = query.lat, lon = query.lon))]
    pub async fn fetch_dataset(
        &self,
        query: &AnalysisQuery,
        shutdown: watch::Receiver<bool>,
    ) -> Result<FetchedDataset> {
        let requests = self.plan(query)?;
        let Some(first) = requests.first() else {
            return Err(IngestionError::NoTimesteps { requested: 0 });
        };
        let target = first.target;

        let output = self
            .pool
            .run(self.fetcher.as_ref(), &requests, shutdown)
            .await;
        if output.report.succeeded == 0 {
            return Err(IngestionError::NoTimesteps {
                requested: output.report.requested,
            });
        }

        let inputs: Vec<AssemblyInput<'_>> = output
            .timesteps
            .iter()
            .map(|t| AssemblyInput::new(&t.payload, Some(&t.request)))
            .collect();
        let dataset = self.assembler.assemble(query.point(), target, &inputs);

        info!(
            points = dataset.len(),
            version = dataset.version(),
            completeness = output.report.completeness(),
            "Assembled dataset"
        );

        Ok(FetchedDataset {
            key: dataset.key(),
            dataset,
            report: output.report,
        })
    }

    /// Full analysis, memoized by location, target date and dataset version.
    #[instrument(skip(self, shutdown), fields(lat = query.lat, lon = query.lon, target_date = %query.target_date))]
    pub async fn analyze(
        &self,
        query: &AnalysisQuery,
        shutdown: watch::Receiver<bool>,
    ) -> Result<AnalysisOutcome> {
        let fetched = self.fetch_dataset(query, shutdown).await?;
        let cache_key = AnalysisCacheKey::new(
            query.lat,
            query.lon,
            query.target_date,
            fetched.dataset.version(),
        );

        if let Some(results) = self.cache.get(&cache_key).await {
            return Ok(AnalysisOutcome {
                results,
                dataset_key: fetched.key,
                report: fetched.report,
                cached: true,
            });
        }

        let results = Arc::new(self.engine.analyze(
            &fetched.dataset,
            query.target_date,
            fetched.report.completeness(),
        )?);
        self.cache.put(cache_key, Arc::clone(&results)).await;

        Ok(AnalysisOutcome {
            results,
            dataset_key: fetched.key,
            report: fetched.report,
            cached: false,
        })
    }
}
