//! Conversion from archive units to display units.

use gldas_common::variables::{lookup, quantity_of};
use gldas_common::Quantity;

/// Kelvin offset of the Celsius scale.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Linear conversion `value * scale + offset` into `unit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConversion {
    pub scale: f64,
    pub offset: f64,
    pub unit: &'static str,
}

impl UnitConversion {
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }
}

/// Conversion for a variable, or `None` when it is kept in its raw unit.
pub fn conversion_for(variable: &str) -> Option<UnitConversion> {
    let conversion = match quantity_of(variable) {
        // K -> °C
        Quantity::Temperature => UnitConversion {
            scale: 1.0,
            offset: -KELVIN_OFFSET,
            unit: "°C",
        },
        // kg m-2 s-1 -> mm/hr
        Quantity::PrecipitationRate => UnitConversion {
            scale: 3600.0,
            offset: 0.0,
            unit: "mm/hr",
        },
        // kg/kg -> g/kg
        Quantity::SpecificHumidity => UnitConversion {
            scale: 1000.0,
            offset: 0.0,
            unit: "g/kg",
        },
        // Pa -> hPa
        Quantity::Pressure => UnitConversion {
            scale: 0.01,
            offset: 0.0,
            unit: "hPa",
        },
        _ => return None,
    };
    Some(conversion)
}

/// Convert a raw value.
pub fn convert(variable: &str, raw: f64) -> f64 {
    match conversion_for(variable) {
        Some(c) => c.apply(raw),
        None => raw,
    }
}

/// Unit of a variable after conversion.
///
/// Unconverted variables keep the unit the payload declared, then the
/// catalog's raw unit, then an empty string.
pub fn output_unit(variable: &str, declared: Option<&str>) -> String {
    if let Some(c) = conversion_for(variable) {
        return c.unit.to_string();
    }
    declared
        .or_else(|| lookup(variable).map(|v| v.raw_unit))
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_to_celsius() {
        assert!((convert("Tair_f_inst", 300.0) - 26.85).abs() < 1e-9);
        assert!((convert("AvgSurfT_inst", 273.15)).abs() < 1e-9);
        assert_eq!(output_unit("Tair_f_inst", Some("K")), "°C");
    }

    #[test]
    fn test_rates_and_pressure() {
        assert!((convert("Rainf_f_tavg", 0.0001) - 0.36).abs() < 1e-12);
        assert!((convert("Evap_tavg", 1e-5) - 0.036).abs() < 1e-12);
        assert!((convert("Qair_f_inst", 0.008) - 8.0).abs() < 1e-12);
        assert!((convert("Psurf_f_inst", 101325.0) - 1013.25).abs() < 1e-9);
    }

    #[test]
    fn test_unconverted_keeps_unit() {
        assert_eq!(convert("Wind_f_inst", 4.2), 4.2);
        assert_eq!(output_unit("Wind_f_inst", None), "m s-1");
        assert_eq!(output_unit("Wind_f_inst", Some("m/s")), "m/s");
        assert_eq!(output_unit("Mystery_var", None), "");
    }
}
