//! Relative humidity derived from specific humidity, temperature and
//! surface pressure.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::dataset::TimeSeriesPoint;

/// Pressure assumed where no surface pressure sample exists.
pub const STANDARD_PRESSURE_HPA: f64 = 1013.25;

/// Ratio of the gas constants of dry air and water vapour.
const EPSILON: f64 = 0.622;

/// Saturation vapour pressure over water (hPa), Magnus form.
pub fn saturation_vapor_pressure(temp_c: f64) -> f64 {
    6.112 * (17.67 * temp_c / (temp_c + 243.5)).exp()
}

/// Relative humidity (%) clamped to [0, 100].
///
/// `specific_humidity_gkg` in g/kg, `pressure_hpa` in hPa.
pub fn relative_humidity(temp_c: f64, specific_humidity_gkg: f64, pressure_hpa: f64) -> f64 {
    let q = specific_humidity_gkg / 1000.0;
    let vapor_pressure = q * pressure_hpa / (EPSILON + (1.0 - EPSILON) * q);
    let rh = 100.0 * vapor_pressure / saturation_vapor_pressure(temp_c);
    rh.clamp(0.0, 100.0)
}

/// Relative humidity wherever temperature and humidity share a timestamp.
///
/// Inputs are already converted (°C, g/kg, hPa). Output is ascending.
pub fn derive_series(
    temperature: &[TimeSeriesPoint],
    specific_humidity: &[TimeSeriesPoint],
    pressure: &[TimeSeriesPoint],
) -> Vec<TimeSeriesPoint> {
    let humidity: HashMap<DateTime<Utc>, f64> = specific_humidity
        .iter()
        .map(|p| (p.timestamp, p.value))
        .collect();
    let pressure: HashMap<DateTime<Utc>, f64> =
        pressure.iter().map(|p| (p.timestamp, p.value)).collect();

    let mut out: Vec<TimeSeriesPoint> = temperature
        .iter()
        .filter_map(|t| {
            let q = humidity.get(&t.timestamp)?;
            let p = pressure
                .get(&t.timestamp)
                .copied()
                .unwrap_or(STANDARD_PRESSURE_HPA);
            Some(TimeSeriesPoint::new(
                t.timestamp,
                relative_humidity(t.value, *q, p),
            ))
        })
        .filter(|p| p.value.is_finite())
        .collect();
    out.sort_by_key(|p| p.timestamp);
    out
}
