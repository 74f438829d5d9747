//! Assembled point dataset.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use gldas_common::{BoundingBox, DatasetKey, TimeRange};
use serde::{Deserialize, Serialize};

/// One value of a variable at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Ordered series per variable for a single query point, plus provenance.
///
/// Built once through [`DatasetBuilder`] and never mutated; combining two
/// datasets produces a new one via [`WeatherDataset::merge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDataset {
    latitude: f64,
    longitude: f64,
    series: BTreeMap<String, Vec<TimeSeriesPoint>>,
    units: BTreeMap<String, String>,
    sources: BTreeSet<String>,
    bbox: Option<BoundingBox>,
    coverage: Option<TimeRange>,
    version: u64,
}

impl WeatherDataset {
    /// Query latitude.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Query longitude.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Series for a variable, ascending by timestamp. Empty when absent.
    pub fn series(&self, variable: &str) -> &[TimeSeriesPoint] {
        self.series.get(variable).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn unit(&self, variable: &str) -> Option<&str> {
        self.units.get(variable).map(String::as_str)
    }

    pub fn units(&self) -> &BTreeMap<String, String> {
        &self.units
    }

    pub fn sources(&self) -> &BTreeSet<String> {
        &self.sources
    }

    /// Extent of the grid cells the values came from.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    /// First and last timestamp across all variables.
    pub fn coverage(&self) -> Option<TimeRange> {
        self.coverage
    }

    /// Content fingerprint; equal datasets share a version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total number of points across all variables.
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persistence key from the query point and temporal coverage.
    pub fn key(&self) -> Option<DatasetKey> {
        self.coverage.map(|c| {
            DatasetKey::new(
                self.latitude,
                self.longitude,
                c.start.date_naive(),
                c.end.date_naive(),
            )
        })
    }

    /// Concatenate two datasets and stable-sort every series.
    ///
    /// Points from `self` precede points from `other` at equal timestamps.
    pub fn merge(&self, other: &WeatherDataset) -> WeatherDataset {
        let mut builder = DatasetBuilder::new(self.latitude, self.longitude);
        for dataset in [self, other] {
            for (variable, points) in &dataset.series {
                builder.extend(variable, points.iter().copied());
            }
            for (variable, unit) in &dataset.units {
                builder.set_unit_if_absent(variable, unit);
            }
            for source in &dataset.sources {
                builder.add_source(source);
            }
            if let Some(b) = dataset.bbox {
                builder.include_bbox(b);
            }
        }
        builder.build()
    }
}

/// Accumulates points before freezing them into a [`WeatherDataset`].
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    latitude: f64,
    longitude: f64,
    series: BTreeMap<String, Vec<TimeSeriesPoint>>,
    units: BTreeMap<String, String>,
    sources: BTreeSet<String>,
    bbox: Option<BoundingBox>,
}

impl DatasetBuilder {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            series: BTreeMap::new(),
            units: BTreeMap::new(),
            sources: BTreeSet::new(),
            bbox: None,
        }
    }

    pub fn push(&mut self, variable: &str, point: TimeSeriesPoint) {
        self.series
            .entry(variable.to_string())
            .or_default()
            .push(point);
    }

    pub fn extend(&mut self, variable: &str, points: impl IntoIterator<Item = TimeSeriesPoint>) {
        self.series
            .entry(variable.to_string())
            .or_default()
            .extend(points);
    }

    pub fn set_unit(&mut self, variable: &str, unit: &str) {
        self.units.insert(variable.to_string(), unit.to_string());
    }

    fn set_unit_if_absent(&mut self, variable: &str, unit: &str) {
        self.units
            .entry(variable.to_string())
            .or_insert_with(|| unit.to_string());
    }

    pub fn add_source(&mut self, source: &str) {
        self.sources.insert(source.to_string());
    }

    pub fn include_point(&mut self, lon: f64, lat: f64) {
        match &mut self.bbox {
            Some(b) => b.include_point(lon, lat),
            None => self.bbox = Some(BoundingBox::from_point(lon, lat)),
        }
    }

    fn include_bbox(&mut self, other: BoundingBox) {
        self.bbox = Some(match self.bbox {
            Some(b) => b.union(&other),
            None => other,
        });
    }

    /// Sort every series (stable), compute coverage and the fingerprint.
    pub fn build(mut self) -> WeatherDataset {
        self.series.retain(|_, points| !points.is_empty());
        for points in self.series.values_mut() {
            points.sort_by_key(|p| p.timestamp);
        }

        let coverage = self
            .series
            .values()
            .filter_map(|points| {
                let first = points.first()?;
                let last = points.last()?;
                Some(TimeRange::new(first.timestamp, last.timestamp))
            })
            .reduce(|a, b| a.union(&b));

        let version = fingerprint(&self.series);

        WeatherDataset {
            latitude: self.latitude,
            longitude: self.longitude,
            series: self.series,
            units: self.units,
            sources: self.sources,
            bbox: self.bbox,
            coverage,
            version,
        }
    }
}

fn fingerprint(series: &BTreeMap<String, Vec<TimeSeriesPoint>>) -> u64 {
    let mut hasher = DefaultHasher::new();
    for (variable, points) in series {
        variable.hash(&mut hasher);
        points.len().hash(&mut hasher);
        for p in points {
            p.timestamp.timestamp().hash(&mut hasher);
            p.value.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}
