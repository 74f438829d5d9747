//! Common types and utilities shared across the GLDAS climatology crates.

pub mod bbox;
pub mod time;
pub mod variables;

pub use bbox::BoundingBox;
pub use time::{
    circular_day_distance, day_of_year, granule_id, in_seasonal_window, parse_date, start_of_day,
    DatasetKey, TimeParseError, TimeRange, TimeUnit, TimeUnits,
};
pub use variables::{Quantity, VariableSpec};
