//! Binary payload decoding (NetCDF and DAP2 DODS).
//!
//! Both readers produce a [`Container`]: a flat list of variables with
//! named dimensions, attributes and raw numeric values. Sample extraction
//! is shared so the two formats behave identically downstream.

pub mod dods;
pub mod nc;

use std::collections::HashMap;

use grid_locator::GridSpec;
use gldas_common::variables::is_coordinate;
use gldas_common::TimeUnits;
use tracing::{debug, warn};

use crate::error::{DecodeError, DecodeResult};
use crate::fill::FillPolicy;
use crate::payload::{DecodedPayload, VariableSample, WireFormat};

/// Attribute value attached to a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Numbers(_) => None,
        }
    }

    pub fn first_number(&self) -> Option<f64> {
        match self {
            AttrValue::Numbers(v) => v.first().copied(),
            AttrValue::Text(_) => None,
        }
    }
}

/// Contents of one variable's array.
#[derive(Debug, Clone, PartialEq)]
pub enum VarData {
    Numeric(Vec<f64>),
    /// Character data; never sampled
    Text,
    /// Declared but unreadable (truncated, out of bounds, ...)
    Unreadable(String),
}

/// One variable of a decoded container.
#[derive(Debug, Clone)]
pub struct ContainerVariable {
    pub name: String,
    pub dim_names: Vec<String>,
    pub shape: Vec<usize>,
    pub attributes: HashMap<String, AttrValue>,
    pub data: VarData,
}

impl ContainerVariable {
    fn attr_number(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(AttrValue::first_number)
    }

    /// Values with declared fills removed (as NaN) and packing undone.
    fn unpacked_values(&self) -> Option<Vec<f64>> {
        let VarData::Numeric(raw) = &self.data else {
            return None;
        };

        let mut declared = FillPolicy::standard();
        for key in ["_FillValue", "missing_value"] {
            if let Some(v) = self.attr_number(key) {
                declared = declared.with_declared(v);
            }
        }
        let scale = self.attr_number("scale_factor").unwrap_or(1.0);
        let offset = self.attr_number("add_offset").unwrap_or(0.0);

        Some(
            raw.iter()
                .map(|&v| {
                    if declared.is_fill(v) {
                        f64::NAN
                    } else {
                        v * scale + offset
                    }
                })
                .collect(),
        )
    }
}

/// Format-independent view of a binary payload.
#[derive(Debug, Clone)]
pub struct Container {
    pub format: WireFormat,
    pub title: Option<String>,
    pub variables: Vec<ContainerVariable>,
}

impl Container {
    fn variable(&self, names: &[&str]) -> Option<&ContainerVariable> {
        names
            .iter()
            .find_map(|n| self.variables.iter().find(|v| v.name == *n))
    }
}

/// Decode a binary payload, sniffing NetCDF vs DODS.
pub fn decode_binary(
    data: &[u8],
    grid: &GridSpec,
) -> DecodeResult<DecodedPayload> {
    let container = if nc::is_netcdf(data) {
        nc::read_container(data)?
    } else if dods::find_data_marker(data).is_some() {
        dods::read_container(data)?
    } else {
        return Err(DecodeError::InvalidFormat(
            "binary payload is neither NetCDF nor DODS".to_string(),
        ));
    };

    extract_samples(&container, grid)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DimRole {
    Time,
    Lat,
    Lon,
    Other,
}

fn dim_role(name: &str) -> DimRole {
    match name {
        "time" => DimRole::Time,
        "lat" | "latitude" => DimRole::Lat,
        "lon" | "longitude" => DimRole::Lon,
        _ => DimRole::Other,
    }
}

/// Turn container variables into samples at absolute grid indices.
pub fn extract_samples(container: &Container, grid: &GridSpec) -> DecodeResult<DecodedPayload> {
    let mut payload = DecodedPayload::new(container.format);
    payload.title = container.title.clone();

    let axis_values = |names: &[&str]| -> Vec<f64> {
        match container.variable(names).map(|v| &v.data) {
            Some(VarData::Numeric(values)) => values.clone(),
            _ => Vec::new(),
        }
    };

    payload.lat_axis = axis_values(&["lat", "latitude"]);
    payload.lon_axis = axis_values(&["lon", "longitude"]);
    payload.time_axis = axis_values(&["time"]);
    payload.time_units = container
        .variable(&["time"])
        .and_then(|v| v.attributes.get("units"))
        .and_then(AttrValue::as_text)
        .and_then(|u| TimeUnits::parse(u).ok());

    if payload.lat_axis.is_empty() || payload.lon_axis.is_empty() {
        return Err(DecodeError::EmptyResponse(
            "binary payload has no lat/lon coordinate arrays".to_string(),
        ));
    }

    let lat_abs: Vec<usize> = payload.lat_axis.iter().map(|&v| grid.lat_index_for(v)).collect();
    let lon_abs: Vec<usize> = payload.lon_axis.iter().map(|&v| grid.lon_index_for(v)).collect();
    let time_count = payload.time_axis.len().max(1);
    let fill = FillPolicy::standard();

    for var in &container.variables {
        if is_coordinate(&var.name) {
            continue;
        }

        let values = match &var.data {
            VarData::Numeric(_) => var.unpacked_values().unwrap_or_default(),
            VarData::Text => continue,
            VarData::Unreadable(reason) => {
                let err = DecodeError::PartialVariableFailure {
                    variable: var.name.clone(),
                    reason: reason.clone(),
                };
                warn!(error = %err, "Skipping unreadable variable");
                payload.failed_variables.push(var.name.clone());
                continue;
            }
        };

        if let Some(AttrValue::Text(units)) = var.attributes.get("units") {
            payload.units.insert(var.name.clone(), units.clone());
        }

        let roles: Vec<DimRole> = var.dim_names.iter().map(|d| dim_role(d)).collect();
        let mut emit = |t: usize, la: usize, lo: usize, value: f64| {
            if fill.is_fill(value) {
                return;
            }
            if let (Some(&lat_index), Some(&lon_index)) = (lat_abs.get(la), lon_abs.get(lo)) {
                payload.samples.push(VariableSample {
                    variable: var.name.clone(),
                    time_index: t,
                    lat_index,
                    lon_index,
                    raw_value: value,
                });
            }
        };

        match roles.as_slice() {
            // Full cube: t*(nlat*nlon) + lat*nlon + lon
            [DimRole::Time, DimRole::Lat, DimRole::Lon] => {
                let (nt, nlat, nlon) = (var.shape[0], var.shape[1], var.shape[2]);
                for t in 0..nt {
                    for la in 0..nlat {
                        for lo in 0..nlon {
                            if let Some(&v) = values.get(t * nlat * nlon + la * nlon + lo) {
                                emit(t, la, lo, v);
                            }
                        }
                    }
                }
            }
            // Static field, replicated across every timestep
            [DimRole::Lat, DimRole::Lon] => {
                let (nlat, nlon) = (var.shape[0], var.shape[1]);
                for t in 0..time_count {
                    for la in 0..nlat {
                        for lo in 0..nlon {
                            if let Some(&v) = values.get(la * nlon + lo) {
                                emit(t, la, lo, v);
                            }
                        }
                    }
                }
            }
            // Per-timestep series, replicated across every cell
            [DimRole::Time] => {
                for (t, &v) in values.iter().enumerate().take(var.shape[0]) {
                    for la in 0..lat_abs.len() {
                        for lo in 0..lon_abs.len() {
                            emit(t, la, lo, v);
                        }
                    }
                }
            }
            // Scalar (or a 1-D field on a non-spatial axis): replicate everywhere
            [] | [DimRole::Other] => {
                let Some(&v) = values.first() else {
                    continue;
                };
                for t in 0..time_count {
                    for la in 0..lat_abs.len() {
                        for lo in 0..lon_abs.len() {
                            emit(t, la, lo, v);
                        }
                    }
                }
            }
            _ => {
                debug!(
                    variable = %var.name,
                    dims = ?var.dim_names,
                    "Skipping variable with unsupported layout"
                );
            }
        }
    }

    if payload.samples.is_empty() {
        return Err(DecodeError::EmptyResponse(
            "no variable samples in binary payload".to_string(),
        ));
    }

    debug!(
        format = ?payload.format,
        samples = payload.samples.len(),
        failed = payload.failed_variables.len(),
        "Decoded binary payload"
    );

    Ok(payload)
}
