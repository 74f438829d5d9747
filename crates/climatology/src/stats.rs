//! Order statistics and simple regressions over sample values.

use crate::error::{ClimatologyError, ClimatologyResult};

/// Linear-interpolation percentile of an unsorted sample set.
///
/// The fractional rank is `p / 100 * (n - 1)`; the result interpolates
/// between the order statistics either side of it.
pub fn percentile(values: &[f64], p: f64) -> ClimatologyResult<f64> {
    if !(0.0..=100.0).contains(&p) {
        return Err(ClimatologyError::InvalidPercentile(p));
    }
    if values.is_empty() {
        return Err(ClimatologyError::EmptySamples);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(percentile_sorted(&sorted, p))
}

/// Same as [`percentile`] for input already sorted ascending and non-empty.
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Least-squares slope of `y` against `x`.
///
/// `None` with fewer than two points or when every `x` is equal.
pub fn linear_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, y) in points {
        covariance += (x - x_mean) * (y - y_mean);
        variance += (x - x_mean).powi(2);
    }

    if variance == 0.0 {
        return None;
    }
    Some(covariance / variance)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: [f64; 10] = [10.0, 12.0, 15.0, 30.0, 31.0, 32.0, 33.0, 34.0, 35.0, 40.0];

    #[test]
    fn test_percentile_linear_interpolation() {
        // rank 8.55 sits between 35 and 40
        assert!((percentile(&SCENARIO, 95.0).unwrap() - 37.75).abs() < 1e-9);
        assert!((percentile(&SCENARIO, 5.0).unwrap() - 10.9).abs() < 1e-9);
        assert_eq!(percentile(&SCENARIO, 0.0).unwrap(), 10.0);
        assert_eq!(percentile(&SCENARIO, 100.0).unwrap(), 40.0);
        assert_eq!(percentile(&SCENARIO, 50.0).unwrap(), 31.5);
    }

    #[test]
    fn test_percentile_ignores_input_order() {
        let mut shuffled = SCENARIO;
        shuffled.reverse();
        assert_eq!(
            percentile(&shuffled, 90.0).unwrap(),
            percentile(&SCENARIO, 90.0).unwrap()
        );
    }

    #[test]
    fn test_percentile_non_decreasing() {
        let values: Vec<f64> = (0..37).map(|i| ((i * 7919) % 101) as f64 / 3.0).collect();
        let mut previous = f64::NEG_INFINITY;
        for step in 0..=200 {
            let p = step as f64 * 0.5;
            let v = percentile(&values, p).unwrap();
            assert!(v >= previous, "p = {}: {} < {}", p, v, previous);
            previous = v;
        }
    }

    #[test]
    fn test_percentile_errors() {
        assert_eq!(percentile(&[], 50.0), Err(ClimatologyError::EmptySamples));
        assert_eq!(
            percentile(&SCENARIO, 101.0),
            Err(ClimatologyError::InvalidPercentile(101.0))
        );
        assert!(matches!(
            percentile(&SCENARIO, f64::NAN),
            Err(ClimatologyError::InvalidPercentile(_))
        ));
    }

    #[test]
    fn test_single_value() {
        assert_eq!(percentile(&[4.2], 95.0).unwrap(), 4.2);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn test_linear_slope() {
        let points = [(2000.0, 10.0), (2001.0, 10.5), (2002.0, 11.0)];
        assert!((linear_slope(&points).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(linear_slope(&points[..1]), None);
        assert_eq!(linear_slope(&[(1.0, 1.0), (1.0, 2.0)]), None);
    }
}
