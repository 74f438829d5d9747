//! In-memory memoization of probability results.
//!
//! The engine is a pure function of the dataset and the target date, so a
//! result can be reused for as long as the dataset version is unchanged.
//!
//! ## Cache Key Structure
//! Location rounded to 4 decimals, target date, dataset version.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use climatology::ProbabilityResults;
use lru::LruCache;
use metrics::counter;
use tokio::sync::RwLock;

/// Default number of memoized analyses.
pub const DEFAULT_CACHE_ENTRIES: usize = 256;

/// Cache key for one analysis.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct AnalysisCacheKey {
    /// Latitude × 10⁴, rounded
    pub lat_e4: i64,
    /// Longitude × 10⁴, rounded
    pub lon_e4: i64,
    pub target_date: NaiveDate,
    pub dataset_version: u64,
}

impl AnalysisCacheKey {
    pub fn new(lat: f64, lon: f64, target_date: NaiveDate, dataset_version: u64) -> Self {
        Self {
            lat_e4: (lat * 10_000.0).round() as i64,
            lon_e4: (lon * 10_000.0).round() as i64,
            target_date,
            dataset_version,
        }
    }
}

/// Statistics for the analysis cache.
#[derive(Debug, Default)]
pub struct AnalysisCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl AnalysisCacheStats {
    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

/// LRU cache of analyses keyed by [`AnalysisCacheKey`].
#[derive(Clone)]
pub struct AnalysisCache {
    cache: Arc<RwLock<LruCache<AnalysisCacheKey, Arc<ProbabilityResults>>>>,
    stats: Arc<AnalysisCacheStats>,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_ENTRIES)
    }
}

impl AnalysisCache {
    /// Create a cache holding at most `max_entries` analyses (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        tracing::debug!(max_entries = capacity.get(), "AnalysisCache initialized");
        Self {
            cache: Arc::new(RwLock::new(LruCache::new(capacity))),
            stats: Arc::new(AnalysisCacheStats::default()),
        }
    }

    pub async fn get(&self, key: &AnalysisCacheKey) -> Option<Arc<ProbabilityResults>> {
        // `LruCache::get` updates recency, so it needs the write lock
        let mut cache = self.cache.write().await;
        match cache.get(key) {
            Some(results) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                counter!("gldas_analysis_cache_hits_total").increment(1);
                Some(Arc::clone(results))
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                counter!("gldas_analysis_cache_misses_total").increment(1);
                None
            }
        }
    }

    pub async fn put(&self, key: AnalysisCacheKey, results: Arc<ProbabilityResults>) {
        self.cache.write().await.put(key, results);
    }

    /// Whether `key` is cached, without touching recency or stats.
    pub async fn contains(&self, key: &AnalysisCacheKey) -> bool {
        self.cache.read().await.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub fn stats(&self) -> &AnalysisCacheStats {
        &self.stats
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let count = cache.len();
        cache.clear();
        tracing::info!(entries = count, "AnalysisCache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use climatology::{DataQuality, HistoricalContext, ProbabilityThresholds};
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn results() -> Arc<ProbabilityResults> {
        Arc::new(ProbabilityResults {
            latitude: 40.1,
            longitude: -88.2,
            target_date: date(2024, 7, 4),
            conditions: BTreeMap::new(),
            thresholds: ProbabilityThresholds::default(),
            confidence_intervals: BTreeMap::new(),
            historical_context: HistoricalContext::default(),
            data_quality: DataQuality {
                completeness: 100.0,
                reliability: 0.0,
                sources: vec![],
            },
            generated_at: Utc::now(),
        })
    }

    #[test]
    fn test_key_rounds_location() {
        let a = AnalysisCacheKey::new(40.123_44, -88.2, date(2024, 7, 4), 7);
        let b = AnalysisCacheKey::new(40.123_36, -88.200_01, date(2024, 7, 4), 7);
        assert_eq!(a, b);
        assert_ne!(a, AnalysisCacheKey::new(40.123_44, -88.2, date(2024, 7, 4), 8));
    }

    #[tokio::test]
    async fn test_cache_put_get() {
        let cache = AnalysisCache::new(4);
        let key = AnalysisCacheKey::new(40.1, -88.2, date(2024, 7, 4), 1);

        assert!(cache.get(&key).await.is_none());
        cache.put(key, results()).await;
        let cached = cache.get(&key).await.unwrap();
        assert_eq!(cached.latitude, 40.1);

        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().misses.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().hit_rate(), 50.0);
    }

    #[tokio::test]
    async fn test_cache_evicts_least_recent() {
        let cache = AnalysisCache::new(2);
        let k1 = AnalysisCacheKey::new(1.0, 1.0, date(2024, 1, 1), 1);
        let k2 = AnalysisCacheKey::new(2.0, 2.0, date(2024, 1, 1), 1);
        let k3 = AnalysisCacheKey::new(3.0, 3.0, date(2024, 1, 1), 1);

        cache.put(k1, results()).await;
        cache.put(k2, results()).await;
        // Touch k1 so k2 becomes least recent
        assert!(cache.get(&k1).await.is_some());
        cache.put(k3, results()).await;

        assert!(cache.contains(&k1).await);
        assert!(!cache.contains(&k2).await);
        assert!(cache.contains(&k3).await);
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert_eq!(cache.len().await, 0);
    }
}
