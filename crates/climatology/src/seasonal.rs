//! Day-of-year window around a target date, wrapping across year ends.

use chrono::{Datelike, NaiveDate};
use gldas_common::{day_of_year, in_seasonal_window};
use timeseries::TimeSeriesPoint;

/// Half-width of the seasonal window in days.
pub const DEFAULT_HALF_WINDOW_DAYS: u32 = 7;

/// Historical samples comparable to a target calendar date.
///
/// A sample belongs to the window when its ordinal day lies within
/// `half_window_days` of the target's ordinal on a 365-day circle, in any
/// year. Feb 29 keeps its ordinal (60), so leap years shift by at most a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonalWindow {
    target: NaiveDate,
    target_day: u32,
    half_window_days: u32,
}

impl SeasonalWindow {
    pub fn new(target: NaiveDate, half_window_days: u32) -> Self {
        Self {
            target,
            target_day: target.ordinal(),
            half_window_days,
        }
    }

    pub fn target(&self) -> NaiveDate {
        self.target
    }

    pub fn half_window_days(&self) -> u32 {
        self.half_window_days
    }

    pub fn contains_day(&self, ordinal: u32) -> bool {
        in_seasonal_window(ordinal, self.target_day, self.half_window_days)
    }

    pub fn contains(&self, point: &TimeSeriesPoint) -> bool {
        self.contains_day(day_of_year(&point.timestamp))
    }

    /// Points inside the window, in their original order.
    pub fn extract(&self, points: &[TimeSeriesPoint]) -> Vec<TimeSeriesPoint> {
        points.iter().filter(|p| self.contains(p)).copied().collect()
    }
}
