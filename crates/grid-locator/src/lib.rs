//! Grid locator and request planner for the GLDAS 0.25° global grid.
//!
//! Maps a geographic point onto the fixed-resolution grid (nearest cell,
//! no interpolation), derives the 3×3 neighborhood fetched around it, and
//! enumerates one request descriptor per 3-hourly timestep of a date range.
//! Everything here is pure and performs no I/O.

pub mod error;
pub mod grid;
pub mod planner;

pub use error::{LocatorError, LocatorResult};
pub use grid::{grids, GeoPoint, GridIndex, GridSpec, GridWindow};
pub use planner::{RequestDescriptor, RequestPlanner, DIURNAL_OFFSETS_HOURS, TIMESTEP_HOURS};
