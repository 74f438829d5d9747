//! Per-timestep request planning.
//!
//! GLDAS 3-hourly granules are one file per timestep. A request descriptor
//! names one granule and the grid window to subset from it.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use gldas_common::{granule_id, in_seasonal_window, start_of_day};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LocatorError, LocatorResult};
use crate::grid::{grids, GeoPoint, GridIndex, GridSpec, GridWindow};

/// Diurnal offsets of the 3-hourly product.
pub const DIURNAL_OFFSETS_HOURS: [u32; 8] = [0, 3, 6, 9, 12, 15, 18, 21];

/// Hours between consecutive GLDAS timesteps.
pub const TIMESTEP_HOURS: i64 = 3;

/// Product short name and version used in granule file names.
const PRODUCT: &str = "GLDAS_NOAH025_3H";
const PRODUCT_VERSION: &str = "021";

/// One self-contained fetch of a single timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Nominal time of the granule
    pub timestamp: DateTime<Utc>,
    pub year: i32,
    /// Ordinal day (1..=366)
    pub day_of_year: u32,
    /// Granule time token, e.g. `A20230101.0300`
    pub granule: String,
    /// Cell nearest the query point
    pub target: GridIndex,
    /// Neighborhood to subset
    pub window: GridWindow,
}

impl RequestDescriptor {
    /// Archive-relative path of the granule, e.g.
    /// `2023/001/GLDAS_NOAH025_3H.A20230101.0000.021.nc4`.
    pub fn resource_path(&self) -> String {
        format!(
            "{}/{:03}/{}.{}.{}.nc4",
            self.year, self.day_of_year, PRODUCT, self.granule, PRODUCT_VERSION
        )
    }
}

/// Builds request descriptors for a point and date range.
#[derive(Debug, Clone)]
pub struct RequestPlanner {
    grid: GridSpec,
    radius: usize,
}

impl Default for RequestPlanner {
    fn default() -> Self {
        Self::new(grids::gldas_0p25())
    }
}

impl RequestPlanner {
    /// Planner with a 3×3 neighborhood.
    pub fn new(grid: GridSpec) -> Self {
        Self { grid, radius: 1 }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// One descriptor per day in `[start, end]` × 8 diurnal offsets,
    /// in chronological order.
    pub fn plan(
        &self,
        point: GeoPoint,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LocatorResult<Vec<RequestDescriptor>> {
        if start > end {
            return Err(LocatorError::InvalidDateRange { start, end });
        }

        let target = self.grid.locate(point)?;
        let window = self.grid.window(target, self.radius);

        let days = (end - start).num_days() as usize + 1;
        let mut requests = Vec::with_capacity(days * DIURNAL_OFFSETS_HOURS.len());

        for date in start.iter_days().take(days) {
            push_day(&mut requests, date, target, window);
        }

        debug!(
            lat = point.lat,
            lon = point.lon,
            requests = requests.len(),
            "Planned timestep requests"
        );

        Ok(requests)
    }

    /// Requests for every day near the target's calendar day, in each of
    /// the given years, whose ordinal lies within `half_window_days` of the
    /// target's ordinal on the 365-day circle.
    ///
    /// This is the membership rule the climatology engine applies, so the
    /// plan never misses or overfetches a day the engine reads. Windows that
    /// cross the year boundary extend into the neighbouring year.
    pub fn plan_seasonal(
        &self,
        point: GeoPoint,
        target_date: NaiveDate,
        years: &[i32],
        half_window_days: u32,
    ) -> LocatorResult<Vec<RequestDescriptor>> {
        let target = self.grid.locate(point)?;
        let window = self.grid.window(target, self.radius);
        let target_day = target_date.ordinal();

        // A leap day moves ordinals by one against the calendar, so scan a
        // spare day each side. Past half a year every day is in the window.
        let reach = Duration::days(i64::from(half_window_days.min(183)) + 1);

        let mut requests = Vec::new();
        for &year in years {
            let Some(center) = anchor_in_year(target_date, year) else {
                continue;
            };
            let (Some(start), Some(end)) = (
                center.checked_sub_signed(reach),
                center.checked_add_signed(reach),
            ) else {
                continue;
            };

            for date in start.iter_days().take_while(|d| *d <= end) {
                if in_seasonal_window(date.ordinal(), target_day, half_window_days) {
                    push_day(&mut requests, date, target, window);
                }
            }
        }

        requests.sort_by_key(|r| r.timestamp);
        requests.dedup_by_key(|r| r.timestamp);

        debug!(
            lat = point.lat,
            lon = point.lon,
            target_date = %target_date,
            years = years.len(),
            requests = requests.len(),
            "Planned seasonal requests"
        );

        Ok(requests)
    }
}

/// The eight diurnal timesteps of one day.
fn push_day(out: &mut Vec<RequestDescriptor>, date: NaiveDate, target: GridIndex, window: GridWindow) {
    let midnight = start_of_day(date);
    for hour in DIURNAL_OFFSETS_HOURS {
        let timestamp = midnight + Duration::hours(hour as i64);
        out.push(RequestDescriptor {
            timestamp,
            year: timestamp.year(),
            day_of_year: timestamp.ordinal(),
            granule: granule_id(&timestamp),
            target,
            window,
        });
    }
}

/// Same month and day in `year`; Feb 29 falls back to Feb 28.
fn anchor_in_year(date: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), date.day() - 1))
}
