//! Time handling utilities for GLDAS data.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Days on the circle used for seasonal day-of-year distances.
pub const DAYS_PER_YEAR: u32 = 365;

/// Parse a calendar date from "YYYY-MM-DD" or a full RFC 3339 timestamp.
pub fn parse_date(s: &str) -> Result<NaiveDate, TimeParseError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Canonical GLDAS granule time token, e.g. `A20230101.0300`.
pub fn granule_id(dt: &DateTime<Utc>) -> String {
    dt.format("A%Y%m%d.%H%M").to_string()
}

/// Distance in days between two ordinal days on a 365-day circle.
///
/// Jan 3 (3) and Dec 29 (363) are 5 days apart.
pub fn circular_day_distance(a: u32, b: u32) -> u32 {
    let d = a.abs_diff(b) % DAYS_PER_YEAR;
    d.min(DAYS_PER_YEAR - d)
}

/// Whether ordinal `day` is within `half_window_days` of `target_day` on the
/// 365-day circle. Shared by request planning and the seasonal filter.
pub fn in_seasonal_window(day: u32, target_day: u32, half_window_days: u32) -> bool {
    circular_day_distance(day, target_day) <= half_window_days
}

/// Midnight UTC of the given date.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// A closed time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    /// Smallest range covering both ranges.
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Unit of a CF-convention time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86400.0,
        }
    }
}

/// Parsed CF time units, e.g. `minutes since 2000-01-01 00:00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: DateTime<Utc>,
}

impl TimeUnits {
    /// Parse a CF `units` attribute.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let lower = s.trim().to_ascii_lowercase();
        let (unit_str, epoch_str) = lower
            .split_once(" since ")
            .ok_or_else(|| TimeParseError::InvalidUnits(s.to_string()))?;

        let unit = match unit_str.trim() {
            "s" | "sec" | "secs" | "second" | "seconds" => TimeUnit::Seconds,
            "min" | "mins" | "minute" | "minutes" => TimeUnit::Minutes,
            "h" | "hr" | "hrs" | "hour" | "hours" => TimeUnit::Hours,
            "d" | "day" | "days" => TimeUnit::Days,
            _ => return Err(TimeParseError::InvalidUnits(s.to_string())),
        };

        let epoch = parse_epoch(epoch_str.trim())
            .ok_or_else(|| TimeParseError::InvalidUnits(s.to_string()))?;

        Ok(Self { unit, epoch })
    }

    /// Convert an axis value into an absolute timestamp (rounded to the second).
    pub fn to_datetime(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let secs = (value * self.unit.seconds()).round();
        if secs.abs() > i64::MAX as f64 / 2.0 {
            return None;
        }
        // Offsets past chrono's representable range are unresolvable, not fatal
        let offset = Duration::try_seconds(secs as i64)?;
        self.epoch.checked_add_signed(offset)
    }
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    // Drop a trailing zone designator; GLDAS epochs are always UTC.
    let s = s
        .trim_end_matches(" utc")
        .trim_end_matches('z')
        .trim();
    let s = s.replace('t', " ");

    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    for fmt in FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .ok()
        .map(start_of_day)
}

/// Key a persistence layer uses for an assembled dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetKey {
    pub lat: f64,
    pub lon: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DatasetKey {
    /// Coordinates are rounded to 4 decimal places.
    pub fn new(lat: f64, lon: f64, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            lat: round4(lat),
            lon: round4(lon),
            start,
            end,
        }
    }

    /// Stable string form of the key.
    pub fn storage_key(&self) -> String {
        format!(
            "gldas/{:.4}_{:.4}/{}_{}",
            self.lat,
            self.lon,
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Ordinal day of year (1..=366) of a timestamp.
pub fn day_of_year(dt: &DateTime<Utc>) -> u32 {
    dt.ordinal()
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid time units: {0}")]
    InvalidUnits(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_date_forms() {
        let d = parse_date("2023-07-04").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2023, 7, 4));

        let d = parse_date("2023-07-04T18:00:00Z").unwrap();
        assert_eq!(d.day(), 4);

        assert!(parse_date("07/04/2023").is_err());
    }

    #[test]
    fn test_granule_id() {
        let dt = Utc.with_ymd_and_hms(2023, 1, 1, 3, 0, 0).unwrap();
        assert_eq!(granule_id(&dt), "A20230101.0300");
    }

    #[test]
    fn test_circular_distance_wraps_year_end() {
        assert_eq!(circular_day_distance(3, 363), 5);
        assert_eq!(circular_day_distance(3, 12), 9);
        assert_eq!(circular_day_distance(200, 200), 0);
        assert_eq!(circular_day_distance(1, 365), 1);
    }

    #[test]
    fn test_time_units_minutes() {
        let units = TimeUnits::parse("minutes since 2000-01-01 00:00:00").unwrap();
        assert_eq!(units.unit, TimeUnit::Minutes);
        let dt = units.to_datetime(180.0).unwrap();
        assert_eq!(dt.hour(), 3);
        assert_eq!(dt.year(), 2000);
    }

    #[test]
    fn test_time_units_days_with_t_separator() {
        let units = TimeUnits::parse("days since 2000-01-01T00:00:00Z").unwrap();
        let dt = units.to_datetime(1.125).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2000, 1, 2, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_time_units_out_of_range_offsets() {
        let units = TimeUnits::parse("hours since 2023-01-01 00:00:00").unwrap();
        // ~1.1 billion years: representable as i64 seconds, not as a DateTime
        assert_eq!(units.to_datetime(1.0e13), None);
        assert_eq!(units.to_datetime(-1.0e13), None);
        assert_eq!(units.to_datetime(f64::MAX), None);
        assert_eq!(units.to_datetime(f64::NAN), None);
        assert!(units.to_datetime(8.0).is_some());
    }

    #[test]
    fn test_time_units_rejects_garbage() {
        assert!(TimeUnits::parse("fortnights since 2000-01-01").is_err());
        assert!(TimeUnits::parse("minutes").is_err());
    }

    #[test]
    fn test_dataset_key_rounding() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        let key = DatasetKey::new(40.123456, -88.987654, start, end);
        assert_eq!(key.storage_key(), "gldas/40.1235_-88.9877/20200101_20201231");
    }
}
