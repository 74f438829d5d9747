//! Collapse decoded payloads into one ordered series per variable.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use gldas_common::variables::{
    AIR_TEMPERATURE, RELATIVE_HUMIDITY, SPECIFIC_HUMIDITY, SURFACE_PRESSURE,
};
use grid_locator::{grids, GeoPoint, GridIndex, GridSpec, RequestDescriptor};
use opendap_parser::{DecodedPayload, WireFormat};
use tracing::debug;

use crate::dataset::{DatasetBuilder, TimeSeriesPoint, WeatherDataset};
use crate::humidity;
use crate::units;

/// Provenance label of the archive product.
pub const PRODUCT_LABEL: &str = "NASA GES DISC GLDAS_NOAH025_3H v2.1";

/// One decoded payload together with the request that produced it.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    pub payload: &'a DecodedPayload,
    pub descriptor: Option<&'a RequestDescriptor>,
}

impl<'a> AssemblyInput<'a> {
    pub fn new(payload: &'a DecodedPayload, descriptor: Option<&'a RequestDescriptor>) -> Self {
        Self {
            payload,
            descriptor,
        }
    }
}

/// Candidate value for one (variable, timestamp).
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cell: GridIndex,
    distance_sq: usize,
    manhattan: usize,
    value: f64,
}

impl Candidate {
    /// Total order: nearer first, then smaller combined offset, then lower
    /// index, then lower value.
    fn rank(&self, other: &Candidate) -> Ordering {
        self.distance_sq
            .cmp(&other.distance_sq)
            .then(self.manhattan.cmp(&other.manhattan))
            .then(self.cell.cmp(&other.cell))
            .then(self.value.total_cmp(&other.value))
    }
}

fn source_label(format: WireFormat) -> String {
    let encoding = match format {
        WireFormat::Ascii => "OPeNDAP ASCII",
        WireFormat::Dods => "OPeNDAP DODS",
        WireFormat::NetCdf => "NetCDF",
    };
    format!("{} ({})", PRODUCT_LABEL, encoding)
}

/// Builds a [`WeatherDataset`] for one query point.
#[derive(Debug, Clone)]
pub struct Assembler {
    grid: GridSpec,
    derive_humidity: bool,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(grids::gldas_0p25())
    }
}

impl Assembler {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            derive_humidity: true,
        }
    }

    /// Skip the derived relative humidity series.
    pub fn without_derived_humidity(mut self) -> Self {
        self.derive_humidity = false;
        self
    }

    /// Assemble every input into one dataset.
    ///
    /// Nearest-cell selection runs within each input. Inputs that resolve to
    /// the same timestamp are not merged: each contributes its own point and
    /// de-duplication is up to the caller (the fetch pool requests every
    /// timestep once). The result does not depend on the order of `inputs`.
    pub fn assemble(
        &self,
        point: GeoPoint,
        target: GridIndex,
        inputs: &[AssemblyInput<'_>],
    ) -> WeatherDataset {
        let mut best: BTreeMap<(String, DateTime<Utc>, usize), Candidate> = BTreeMap::new();
        let mut declared_units: BTreeMap<String, String> = BTreeMap::new();
        let mut sources: BTreeSet<String> = BTreeSet::new();
        let mut dropped = 0usize;

        for (input_index, input) in inputs.iter().enumerate() {
            let payload = input.payload;
            sources.insert(source_label(payload.format));
            // Smallest label wins so input order never matters
            for (variable, unit) in &payload.units {
                declared_units
                    .entry(variable.clone())
                    .and_modify(|current| {
                        if unit.as_str() < current.as_str() {
                            *current = unit.clone();
                        }
                    })
                    .or_insert_with(|| unit.clone());
            }

            for sample in &payload.samples {
                let Some(timestamp) = payload.timestamp_for(sample.time_index, input.descriptor)
                else {
                    dropped += 1;
                    continue;
                };

                let cell = GridIndex::new(sample.lat_index, sample.lon_index);
                let candidate = Candidate {
                    cell,
                    distance_sq: cell.distance_sq(&target),
                    manhattan: cell.manhattan(&target),
                    value: sample.raw_value,
                };

                best.entry((sample.variable.clone(), timestamp, input_index))
                    .and_modify(|current| {
                        if candidate.rank(current) == Ordering::Less {
                            *current = candidate;
                        }
                    })
                    .or_insert(candidate);
            }
        }

        // Same-timestamp points from different inputs are ordered by value
        let mut selected: Vec<(&String, DateTime<Utc>, Candidate)> = best
            .iter()
            .map(|((variable, timestamp, _), candidate)| (variable, *timestamp, *candidate))
            .collect();
        selected.sort_by(|a, b| {
            a.0.cmp(b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.value.total_cmp(&b.2.value))
        });

        let mut builder = DatasetBuilder::new(point.lat, point.lon);
        for (variable, timestamp, candidate) in &selected {
            builder.push(
                variable,
                TimeSeriesPoint::new(*timestamp, units::convert(variable, candidate.value)),
            );
            let center = self.grid.cell_center(candidate.cell);
            builder.include_point(center.lon, center.lat);
        }

        let variables: BTreeSet<&String> = best.keys().map(|(name, _, _)| name).collect();
        for variable in variables {
            let declared = declared_units.get(variable).map(String::as_str);
            builder.set_unit(variable, &units::output_unit(variable, declared));
        }

        for source in &sources {
            builder.add_source(source);
        }

        let mut dataset = builder.build();

        if self.derive_humidity {
            let rh = humidity::derive_series(
                dataset.series(AIR_TEMPERATURE),
                dataset.series(SPECIFIC_HUMIDITY),
                dataset.series(SURFACE_PRESSURE),
            );
            if !rh.is_empty() {
                let mut extra = DatasetBuilder::new(point.lat, point.lon);
                extra.extend(RELATIVE_HUMIDITY, rh);
                extra.set_unit(RELATIVE_HUMIDITY, "%");
                dataset = dataset.merge(&extra.build());
            }
        }

        debug!(
            inputs = inputs.len(),
            variables = dataset.variables().count(),
            points = dataset.len(),
            dropped = dropped,
            "Assembled point time series"
        );

        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use opendap_parser::VariableSample;

    fn payload(samples: Vec<VariableSample>) -> DecodedPayload {
        let mut p = DecodedPayload {
            format: WireFormat::Ascii,
            samples,
            lat_axis: vec![],
            lon_axis: vec![],
            time_axis: vec![],
            time_units: None,
            units: BTreeMap::new(),
            failed_variables: vec![],
            rejected_lines: 0,
            title: None,
        };
        p.time_units = gldas_common::TimeUnits::parse("hours since 2020-01-01 00:00:00").ok();
        p.time_axis = vec![0.0, 3.0];
        p
    }

    fn sample(variable: &str, t: usize, lat: usize, lon: usize, v: f64) -> VariableSample {
        VariableSample {
            variable: variable.to_string(),
            time_index: t,
            lat_index: lat,
            lon_index: lon,
            raw_value: v,
        }
    }

    #[test]
    fn test_candidate_ranking() {
        let target = GridIndex::new(10, 10);
        let make = |lat, lon, value| {
            let cell = GridIndex::new(lat, lon);
            Candidate {
                cell,
                distance_sq: cell.distance_sq(&target),
                manhattan: cell.manhattan(&target),
                value,
            }
        };
        assert_eq!(make(10, 10, 5.0).rank(&make(10, 11, 1.0)), Ordering::Less);
        assert_eq!(make(9, 10, 5.0).rank(&make(10, 11, 1.0)), Ordering::Less);
        assert_eq!(make(10, 10, 1.0).rank(&make(10, 10, 2.0)), Ordering::Less);
    }

    #[test]
    fn test_nearest_cell_and_conversion() {
        let p = payload(vec![
            sample("Tair_f_inst", 0, 399, 366, 280.0),
            sample("Tair_f_inst", 0, 400, 367, 290.0),
            sample("Tair_f_inst", 1, 401, 367, 285.0),
        ]);
        let ds = Assembler::default().assemble(
            GeoPoint::new(40.1, -88.2),
            GridIndex::new(400, 367),
            &[AssemblyInput::new(&p, None)],
        );

        let series = ds.series("Tair_f_inst");
        assert_eq!(series.len(), 2);
        assert!((series[0].value - 16.85).abs() < 1e-9);
        assert!((series[1].value - 11.85).abs() < 1e-9);
        assert_eq!(
            series[1].timestamp,
            Utc.with_ymd_and_hms(2020, 1, 1, 3, 0, 0).unwrap()
        );
        assert_eq!(ds.unit("Tair_f_inst"), Some("°C"));
    }

    #[test]
    fn test_overlapping_inputs_each_keep_a_point() {
        let a = payload(vec![
            sample("Tair_f_inst", 0, 400, 367, 290.0),
            sample("Tair_f_inst", 0, 399, 367, 100.0),
        ]);
        let b = payload(vec![sample("Tair_f_inst", 0, 400, 367, 280.0)]);
        let assemble = |inputs: &[AssemblyInput<'_>]| {
            Assembler::default().assemble(
                GeoPoint::new(40.1, -88.2),
                GridIndex::new(400, 367),
                inputs,
            )
        };

        let forward = assemble(&[AssemblyInput::new(&a, None), AssemblyInput::new(&b, None)]);
        let backward = assemble(&[AssemblyInput::new(&b, None), AssemblyInput::new(&a, None)]);

        // Nearest cell per input, no merge across inputs
        let series = forward.series("Tair_f_inst");
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].timestamp, series[1].timestamp);
        assert!((series[0].value - 6.85).abs() < 1e-9);
        assert!((series[1].value - 16.85).abs() < 1e-9);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_unresolvable_timestamps_dropped() {
        let mut p = payload(vec![sample("Wind_f_inst", 5, 400, 367, 3.0)]);
        p.time_units = None;
        let ds = Assembler::default().assemble(
            GeoPoint::new(40.1, -88.2),
            GridIndex::new(400, 367),
            &[AssemblyInput::new(&p, None)],
        );
        assert!(ds.is_empty());
    }
}
