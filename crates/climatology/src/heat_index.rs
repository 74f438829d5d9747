//! Apparent temperature from air temperature and relative humidity.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use timeseries::TimeSeriesPoint;

/// Below this air temperature (°C, 80 °F) the heat index is the air
/// temperature itself.
pub const HEAT_INDEX_CUTOFF_C: f64 = 26.7;

fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Rothfusz regression with the NWS humidity adjustments.
///
/// `temp_c` in °C, `rh` in percent; returns °C.
pub fn heat_index(temp_c: f64, rh: f64) -> f64 {
    if temp_c < HEAT_INDEX_CUTOFF_C {
        return temp_c;
    }

    let t = celsius_to_fahrenheit(temp_c);
    let mut hi = -42.379 + 2.049_015_23 * t + 10.143_331_27 * rh
        - 0.224_755_41 * t * rh
        - 0.006_837_83 * t * t
        - 0.054_817_17 * rh * rh
        + 0.001_228_74 * t * t * rh
        + 0.000_852_82 * t * rh * rh
        - 0.000_001_99 * t * t * rh * rh;

    if rh < 13.0 && (80.0..=112.0).contains(&t) {
        hi -= ((13.0 - rh) / 4.0) * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
    } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
        hi += ((rh - 85.0) / 10.0) * ((87.0 - t) / 5.0);
    }

    fahrenheit_to_celsius(hi)
}

/// Heat index wherever temperature and relative humidity share a timestamp.
pub fn heat_index_series(
    temperature: &[TimeSeriesPoint],
    relative_humidity: &[TimeSeriesPoint],
) -> Vec<TimeSeriesPoint> {
    let humidity: HashMap<DateTime<Utc>, f64> = relative_humidity
        .iter()
        .map(|p| (p.timestamp, p.value))
        .collect();

    temperature
        .iter()
        .filter_map(|t| {
            let rh = humidity.get(&t.timestamp)?;
            Some(TimeSeriesPoint::new(t.timestamp, heat_index(t.value, *rh)))
        })
        .filter(|p| p.value.is_finite())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_below_cutoff_is_unchanged() {
        for temp in [-30.0, 0.0, 15.5, 26.0, 26.69] {
            for rh in [0.0, 5.0, 50.0, 95.0, 100.0] {
                assert_eq!(heat_index(temp, rh), temp);
            }
        }
    }

    #[test]
    fn test_hot_humid_reference() {
        // 90 °F at 70 % is about 106 °F in the NWS table
        let hi = heat_index(fahrenheit_to_celsius(90.0), 70.0);
        let hi_f = celsius_to_fahrenheit(hi);
        assert!((hi_f - 105.9).abs() < 1.0, "hi = {} °F", hi_f);
    }

    #[test]
    fn test_dry_adjustment_lowers_index() {
        let t = fahrenheit_to_celsius(95.0);
        let dry = heat_index(t, 10.0);
        let unadjusted_rh = heat_index(t, 13.0);
        assert!(dry < unadjusted_rh);
    }

    #[test]
    fn test_humid_adjustment_raises_index() {
        let t = fahrenheit_to_celsius(82.0);
        assert!(heat_index(t, 95.0) > heat_index(t, 85.0));
    }

    #[test]
    fn test_series_joins_on_timestamp() {
        let t0 = Utc.with_ymd_and_hms(2021, 7, 1, 18, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2021, 7, 1, 21, 0, 0).unwrap();
        let temps = vec![TimeSeriesPoint::new(t0, 20.0), TimeSeriesPoint::new(t1, 32.0)];
        let rh = vec![TimeSeriesPoint::new(t0, 60.0)];

        let series = heat_index_series(&temps, &rh);
        assert_eq!(series, vec![TimeSeriesPoint::new(t0, 20.0)]);
    }
}
