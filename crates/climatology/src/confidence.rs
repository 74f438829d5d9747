//! Sample-size confidence and binomial intervals.

use serde::{Deserialize, Serialize};

/// z-score of a two-sided 95 % interval.
pub const Z_95: f64 = 1.96;

/// (minimum sample count, stated confidence %), descending.
const CONFIDENCE_STEPS: [(usize, u32); 8] = [
    (1000, 95),
    (500, 90),
    (200, 80),
    (100, 70),
    (50, 60),
    (20, 45),
    (10, 30),
    (1, 15),
];

/// Stated confidence (%) for a seasonal sample count.
///
/// Non-decreasing in `sample_size`, 0 for no samples.
pub fn confidence_for(sample_size: usize) -> u32 {
    CONFIDENCE_STEPS
        .iter()
        .find(|(min, _)| sample_size >= *min)
        .map(|(_, confidence)| *confidence)
        .unwrap_or(0)
}

/// Interval around an occurrence rate, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Wald interval of `occurrences / sample_size` at z = 1.96, clamped to
/// [0, 100]. `None` for an empty sample.
pub fn wald_interval(occurrences: usize, sample_size: usize) -> Option<ConfidenceInterval> {
    if sample_size == 0 {
        return None;
    }
    let n = sample_size as f64;
    let p = occurrences as f64 / n;
    let se = (p * (1.0 - p) / n).sqrt();
    Some(ConfidenceInterval {
        lower: ((p - Z_95 * se) * 100.0).clamp(0.0, 100.0),
        upper: ((p + Z_95 * se) * 100.0).clamp(0.0, 100.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_steps() {
        assert_eq!(confidence_for(0), 0);
        assert_eq!(confidence_for(1), 15);
        assert_eq!(confidence_for(10), 30);
        assert_eq!(confidence_for(199), 70);
        assert_eq!(confidence_for(5000), 95);
    }

    #[test]
    fn test_confidence_monotonic_and_bounded() {
        let mut previous = 0;
        for n in 0..2000 {
            let c = confidence_for(n);
            assert!(c >= previous);
            assert!(c <= 100);
            previous = c;
        }
    }

    #[test]
    fn test_wald_interval() {
        let ci = wald_interval(50, 100).unwrap();
        assert!((ci.lower - 40.2).abs() < 1e-9);
        assert!((ci.upper - 59.8).abs() < 1e-9);
    }

    #[test]
    fn test_wald_interval_clamped() {
        let ci = wald_interval(1, 10).unwrap();
        assert_eq!(ci.lower, 0.0);
        assert!((ci.upper - 28.59).abs() < 0.01);

        let none = wald_interval(0, 40).unwrap();
        assert_eq!((none.lower, none.upper), (0.0, 0.0));
        assert_eq!(wald_interval(0, 0), None);
    }
}
