//! Fill-value detection.
//!
//! GLDAS marks missing cells (ocean, ice sheets) with sentinel values that
//! must never reach the time series.

/// Sentinels used across GLDAS products and the NetCDF default float fill.
pub const FILL_SENTINELS: [f64; 3] = [-9999.0, -999.0, 9.96921e36];

/// Magnitudes at or above this are treated as the NetCDF default fill.
const HUGE_FILL_THRESHOLD: f64 = 9.9e36;

/// Fill-value test combining the standard sentinels with any
/// `_FillValue` / `missing_value` a container declares.
#[derive(Debug, Clone, Default)]
pub struct FillPolicy {
    declared: Vec<f64>,
}

impl FillPolicy {
    /// Only the standard sentinels.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Add a container-declared fill value.
    pub fn with_declared(mut self, value: f64) -> Self {
        if value.is_finite() {
            self.declared.push(value);
        }
        self
    }

    /// True when `value` must be dropped.
    pub fn is_fill(&self, value: f64) -> bool {
        if !value.is_finite() || value.abs() >= HUGE_FILL_THRESHOLD {
            return true;
        }

        FILL_SENTINELS[..2]
            .iter()
            .chain(self.declared.iter())
            .any(|&s| approx_eq(value, s))
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * b.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_sentinels() {
        let policy = FillPolicy::standard();
        assert!(policy.is_fill(-9999.0));
        assert!(policy.is_fill(-999.0));
        assert!(policy.is_fill(9.96921e36));
        assert!(policy.is_fill(9.969209968386869e36));
        assert!(policy.is_fill(f64::NAN));
        assert!(policy.is_fill(f64::INFINITY));
    }

    #[test]
    fn test_real_values_pass() {
        let policy = FillPolicy::standard();
        assert!(!policy.is_fill(273.15));
        assert!(!policy.is_fill(0.0));
        assert!(!policy.is_fill(-999.5));
        assert!(!policy.is_fill(101325.0));
    }

    #[test]
    fn test_declared_fill() {
        let policy = FillPolicy::standard().with_declared(-32767.0);
        assert!(policy.is_fill(-32767.0));
        assert!(!policy.is_fill(-32766.0));
    }
}
