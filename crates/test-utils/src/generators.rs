//! Test data generators for synthetic GLDAS-like series.
//!
//! Values are deterministic so expected thresholds and probabilities can be
//! computed by hand in tests.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};

/// A `(timestamp, value)` pair as produced by the generators.
pub type Sample = (DateTime<Utc>, f64);

/// 3-hourly timestamps covering every day in `[start, end]`.
pub fn three_hourly_timestamps(start: NaiveDate, end: NaiveDate) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let mut day = start;
    while day <= end {
        let midnight = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).expect("midnight exists"));
        for step in 0..8 {
            out.push(midnight + Duration::hours(3 * step));
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}

/// Samples a function at every 3-hourly timestep of `[start, end]`.
pub fn generate_series<F>(start: NaiveDate, end: NaiveDate, f: F) -> Vec<Sample>
where
    F: Fn(DateTime<Utc>) -> f64,
{
    three_hourly_timestamps(start, end)
        .into_iter()
        .map(|t| (t, f(t)))
        .collect()
}

/// Seasonal-window coverage: `±half_window_days` around `month/day` in each
/// of `years`, sampled every 3 hours.
pub fn seasonal_window_series<F>(
    month: u32,
    day: u32,
    years: &[i32],
    half_window_days: i64,
    f: F,
) -> Vec<Sample>
where
    F: Fn(DateTime<Utc>) -> f64,
{
    let mut out = Vec::new();
    for &year in years {
        let Some(center) = NaiveDate::from_ymd_opt(year, month, day) else {
            continue;
        };
        out.extend(generate_series(
            center - Duration::days(half_window_days),
            center + Duration::days(half_window_days),
            &f,
        ));
    }
    out
}

/// Air temperature in Kelvin with an annual cycle (peak late July) and a
/// diurnal cycle (peak 21 UTC), about 288 K on average.
pub fn annual_cycle_kelvin(t: DateTime<Utc>) -> f64 {
    use std::f64::consts::PI;
    let doy = t.ordinal() as f64;
    let hour = t.hour() as f64;
    288.0 + 12.0 * (2.0 * PI * (doy - 205.0) / 365.0).cos()
        + 5.0 * (2.0 * PI * (hour - 21.0) / 24.0).cos()
}

/// Precipitation rate in kg m-2 s-1: dry except every fifth timestep.
pub fn intermittent_rain_rate(t: DateTime<Utc>) -> f64 {
    let step = t.timestamp() / (3 * 3600);
    if step % 5 == 0 {
        (simple_hash(step as u32, 0, 7) % 100) as f64 * 1e-6
    } else {
        0.0
    }
}

/// Deterministic value in `[0, 1)` for an index and seed.
pub fn deterministic_noise(index: u32, seed: u32) -> f64 {
    (simple_hash(index, 0, seed) % 10_000) as f64 / 10_000.0
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
