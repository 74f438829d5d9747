//! Point time series assembly.
//!
//! Decoded payloads carry every cell of a small window around the query
//! point. The [`Assembler`] keeps, for each variable and timestamp, the value
//! from the cell nearest the target index, converts it to display units and
//! adds a derived relative humidity series.

pub mod assembler;
pub mod dataset;
pub mod humidity;
pub mod units;

pub use assembler::{Assembler, AssemblyInput, PRODUCT_LABEL};
pub use dataset::{DatasetBuilder, TimeSeriesPoint, WeatherDataset};
