//! Uniform decoder output shared by every wire format.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use gldas_common::TimeUnits;
use grid_locator::{RequestDescriptor, TIMESTEP_HOURS};
use serde::{Deserialize, Serialize};

/// Encoding a payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireFormat {
    /// OPeNDAP `.ascii` response
    Ascii,
    /// DAP2 `.dods` response (DDS header + XDR body)
    Dods,
    /// NetCDF file, classic or NetCDF-4/HDF5
    NetCdf,
}

/// One raw value at an absolute grid cell and a payload-local time index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSample {
    pub variable: String,
    pub time_index: usize,
    pub lat_index: usize,
    pub lon_index: usize,
    /// Value in the archive's physical units
    pub raw_value: f64,
}

/// Everything extracted from one response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedPayload {
    pub format: WireFormat,
    pub samples: Vec<VariableSample>,
    pub lat_axis: Vec<f64>,
    pub lon_axis: Vec<f64>,
    pub time_axis: Vec<f64>,
    /// Present when the container declares CF time units
    pub time_units: Option<TimeUnits>,
    /// Declared `units` attribute per variable
    pub units: BTreeMap<String, String>,
    /// Variables that were declared but could not be read
    pub failed_variables: Vec<String>,
    /// ASCII lines that did not match any accepted shape
    pub rejected_lines: usize,
    /// Dataset title or name, when the container carries one
    pub title: Option<String>,
}

impl DecodedPayload {
    pub(crate) fn new(format: WireFormat) -> Self {
        Self {
            format,
            samples: Vec::new(),
            lat_axis: Vec::new(),
            lon_axis: Vec::new(),
            time_axis: Vec::new(),
            time_units: None,
            units: BTreeMap::new(),
            failed_variables: Vec::new(),
            rejected_lines: 0,
            title: None,
        }
    }

    /// Names of variables that produced at least one sample.
    pub fn variables(&self) -> BTreeSet<&str> {
        self.samples.iter().map(|s| s.variable.as_str()).collect()
    }

    /// Some declared variables failed to decode.
    pub fn is_partial(&self) -> bool {
        !self.failed_variables.is_empty()
    }

    /// Absolute timestamp of a payload-local time index.
    ///
    /// Uses the CF time axis when units are known, otherwise the request
    /// descriptor's timestamp plus one 3-hour step per index.
    pub fn timestamp_for(
        &self,
        time_index: usize,
        descriptor: Option<&RequestDescriptor>,
    ) -> Option<DateTime<Utc>> {
        if let (Some(units), Some(&value)) = (self.time_units, self.time_axis.get(time_index)) {
            if let Some(dt) = units.to_datetime(value) {
                return Some(dt);
            }
        }

        descriptor.and_then(|d| {
            let hours = i64::try_from(time_index).ok()?.checked_mul(TIMESTEP_HOURS)?;
            d.timestamp.checked_add_signed(Duration::try_hours(hours)?)
        })
    }
}
