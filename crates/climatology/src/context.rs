//! Per-year summaries, extremes and the long-term temperature trend.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use timeseries::TimeSeriesPoint;

use crate::stats::{linear_slope, mean};

/// Weight of mean temperature (°C) in the composite index.
pub const COMPOSITE_TEMPERATURE_WEIGHT: f64 = 0.7;
/// Weight of mean daily precipitation (mm/day) in the composite index.
pub const COMPOSITE_PRECIPITATION_WEIGHT: f64 = 0.3;

const HOURS_PER_DAY: f64 = 24.0;
const HALF_YEAR_DAYS: i64 = 182;

/// One season of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlySummary {
    /// Year of the season's centre day. A Jan 3 season includes the
    /// preceding late December.
    pub year: i32,
    pub mean_temperature: Option<f64>,
    /// mm/day, from the mean hourly rate.
    pub mean_daily_precipitation: Option<f64>,
    /// `0.7 * mean_temperature + 0.3 * mean_daily_precipitation`; requires both.
    pub composite_index: Option<f64>,
    pub samples: usize,
}

/// A single record value and when it happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremeRecord {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtremeEvents {
    pub max_temperature: Option<ExtremeRecord>,
    pub min_temperature: Option<ExtremeRecord>,
    pub max_precipitation: Option<ExtremeRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalContext {
    pub yearly: Vec<YearlySummary>,
    pub extremes: ExtremeEvents,
    /// Least-squares slope of yearly mean temperature, °C per decade.
    pub warming_trend_per_decade: Option<f64>,
}

/// Summarize seasonal temperature (°C) and precipitation (mm/hr) samples
/// around the ordinal day `target_day`.
pub fn historical_context(
    temperature: &[TimeSeriesPoint],
    precipitation: &[TimeSeriesPoint],
    target_day: u32,
) -> HistoricalContext {
    let temps_by_year = group_by_season_year(temperature, target_day);
    let precip_by_year = group_by_season_year(precipitation, target_day);

    let mut years: Vec<i32> = temps_by_year
        .keys()
        .chain(precip_by_year.keys())
        .copied()
        .collect();
    years.sort_unstable();
    years.dedup();

    let yearly: Vec<YearlySummary> = years
        .into_iter()
        .map(|year| {
            let temps = temps_by_year.get(&year).map(Vec::as_slice).unwrap_or(&[]);
            let rates = precip_by_year.get(&year).map(Vec::as_slice).unwrap_or(&[]);
            let mean_temperature = mean(temps);
            let mean_daily_precipitation = mean(rates).map(|rate| rate * HOURS_PER_DAY);
            let composite_index = match (mean_temperature, mean_daily_precipitation) {
                (Some(t), Some(p)) => Some(
                    COMPOSITE_TEMPERATURE_WEIGHT * t + COMPOSITE_PRECIPITATION_WEIGHT * p,
                ),
                _ => None,
            };
            YearlySummary {
                year,
                mean_temperature,
                mean_daily_precipitation,
                composite_index,
                samples: temps.len() + rates.len(),
            }
        })
        .collect();

    let trend_points: Vec<(f64, f64)> = yearly
        .iter()
        .filter_map(|y| Some((y.year as f64, y.mean_temperature?)))
        .collect();
    let warming_trend_per_decade = linear_slope(&trend_points).map(|per_year| per_year * 10.0);

    HistoricalContext {
        yearly,
        extremes: ExtremeEvents {
            max_temperature: extreme(temperature, |candidate, best| candidate > best),
            min_temperature: extreme(temperature, |candidate, best| candidate < best),
            max_precipitation: extreme(precipitation, |candidate, best| candidate > best),
        },
        warming_trend_per_decade,
    }
}

/// Year whose `target_day` is nearest to the timestamp.
pub fn season_year(timestamp: &DateTime<Utc>, target_day: u32) -> i32 {
    let offset = i64::from(timestamp.ordinal()) - i64::from(target_day);
    match offset {
        o if o > HALF_YEAR_DAYS => timestamp.year() + 1,
        o if o < -HALF_YEAR_DAYS => timestamp.year() - 1,
        _ => timestamp.year(),
    }
}

fn group_by_season_year(points: &[TimeSeriesPoint], target_day: u32) -> BTreeMap<i32, Vec<f64>> {
    let mut groups: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for p in points {
        groups
            .entry(season_year(&p.timestamp, target_day))
            .or_default()
            .push(p.value);
    }
    groups
}

/// Most extreme point; ties keep the earliest timestamp.
fn extreme(points: &[TimeSeriesPoint], beats: impl Fn(f64, f64) -> bool) -> Option<ExtremeRecord> {
    let mut best: Option<&TimeSeriesPoint> = None;
    for p in points {
        best = match best {
            Some(current)
                if beats(p.value, current.value)
                    || (p.value == current.value && p.timestamp < current.timestamp) =>
            {
                Some(p)
            }
            Some(current) => Some(current),
            None => Some(p),
        };
    }
    best.map(|p| ExtremeRecord {
        timestamp: p.timestamp,
        value: p.value,
    })
}
