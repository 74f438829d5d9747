//! GLDAS Noah 0.25° 3-hourly variable catalog.
//!
//! Names follow the GLDAS-2.1 product. Units are as delivered by the
//! archive; conversion to display units happens in the assembler.

use serde::{Deserialize, Serialize};

/// Near-surface air temperature (K).
pub const AIR_TEMPERATURE: &str = "Tair_f_inst";
/// Total precipitation rate (kg m-2 s-1).
pub const PRECIPITATION_RATE: &str = "Rainf_f_tavg";
/// Specific humidity (kg kg-1).
pub const SPECIFIC_HUMIDITY: &str = "Qair_f_inst";
/// Surface pressure (Pa).
pub const SURFACE_PRESSURE: &str = "Psurf_f_inst";
/// Near-surface wind speed (m s-1).
pub const WIND_SPEED: &str = "Wind_f_inst";
/// Surface albedo (%).
pub const ALBEDO: &str = "Albedo_inst";
/// Relative humidity derived during assembly (%).
pub const RELATIVE_HUMIDITY: &str = "RelHum";

/// Physical quantity a variable measures; drives unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    Temperature,
    PrecipitationRate,
    SpecificHumidity,
    Pressure,
    WindSpeed,
    RelativeHumidity,
    Radiation,
    Fraction,
    Other,
}

/// Static description of one archive variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariableSpec {
    pub name: &'static str,
    pub long_name: &'static str,
    pub raw_unit: &'static str,
    pub quantity: Quantity,
}

const CATALOG: &[VariableSpec] = &[
    VariableSpec {
        name: AIR_TEMPERATURE,
        long_name: "Air temperature",
        raw_unit: "K",
        quantity: Quantity::Temperature,
    },
    VariableSpec {
        name: "AvgSurfT_inst",
        long_name: "Average surface skin temperature",
        raw_unit: "K",
        quantity: Quantity::Temperature,
    },
    VariableSpec {
        name: "SoilTMP0_10cm_inst",
        long_name: "Soil temperature 0-10 cm",
        raw_unit: "K",
        quantity: Quantity::Temperature,
    },
    VariableSpec {
        name: PRECIPITATION_RATE,
        long_name: "Total precipitation rate",
        raw_unit: "kg m-2 s-1",
        quantity: Quantity::PrecipitationRate,
    },
    VariableSpec {
        name: "Rainf_tavg",
        long_name: "Rain precipitation rate",
        raw_unit: "kg m-2 s-1",
        quantity: Quantity::PrecipitationRate,
    },
    VariableSpec {
        name: "Snowf_tavg",
        long_name: "Snow precipitation rate",
        raw_unit: "kg m-2 s-1",
        quantity: Quantity::PrecipitationRate,
    },
    VariableSpec {
        name: "Evap_tavg",
        long_name: "Evapotranspiration",
        raw_unit: "kg m-2 s-1",
        quantity: Quantity::PrecipitationRate,
    },
    VariableSpec {
        name: SPECIFIC_HUMIDITY,
        long_name: "Specific humidity",
        raw_unit: "kg kg-1",
        quantity: Quantity::SpecificHumidity,
    },
    VariableSpec {
        name: SURFACE_PRESSURE,
        long_name: "Surface pressure",
        raw_unit: "Pa",
        quantity: Quantity::Pressure,
    },
    VariableSpec {
        name: WIND_SPEED,
        long_name: "Wind speed",
        raw_unit: "m s-1",
        quantity: Quantity::WindSpeed,
    },
    VariableSpec {
        name: "SWdown_f_tavg",
        long_name: "Downward shortwave radiation flux",
        raw_unit: "W m-2",
        quantity: Quantity::Radiation,
    },
    VariableSpec {
        name: "LWdown_f_tavg",
        long_name: "Downward longwave radiation flux",
        raw_unit: "W m-2",
        quantity: Quantity::Radiation,
    },
    VariableSpec {
        name: ALBEDO,
        long_name: "Albedo",
        raw_unit: "%",
        quantity: Quantity::Fraction,
    },
    VariableSpec {
        name: RELATIVE_HUMIDITY,
        long_name: "Relative humidity (derived)",
        raw_unit: "%",
        quantity: Quantity::RelativeHumidity,
    },
];

/// Look up a variable by its archive name.
pub fn lookup(name: &str) -> Option<&'static VariableSpec> {
    CATALOG.iter().find(|v| v.name == name)
}

/// Quantity for a variable name; unknown names are `Other`.
pub fn quantity_of(name: &str) -> Quantity {
    lookup(name).map(|v| v.quantity).unwrap_or(Quantity::Other)
}

/// Variables requested by default: everything the probability engine reads.
pub fn default_request_variables() -> Vec<String> {
    [
        AIR_TEMPERATURE,
        PRECIPITATION_RATE,
        SPECIFIC_HUMIDITY,
        SURFACE_PRESSURE,
        WIND_SPEED,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Names that describe coordinate axes rather than data.
pub fn is_coordinate(name: &str) -> bool {
    matches!(
        name,
        "lat" | "lon" | "time" | "latitude" | "longitude" | "time_bnds" | "time_bounds"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_variable() {
        let spec = lookup(AIR_TEMPERATURE).unwrap();
        assert_eq!(spec.raw_unit, "K");
        assert_eq!(spec.quantity, Quantity::Temperature);
    }

    #[test]
    fn test_unknown_variable_is_other() {
        assert_eq!(quantity_of("CanopInt_inst"), Quantity::Other);
    }

    #[test]
    fn test_default_request_variables_cover_engine_inputs() {
        let vars = default_request_variables();
        assert!(vars.iter().any(|v| v == WIND_SPEED));
        assert!(vars.iter().any(|v| v == PRECIPITATION_RATE));
        assert!(!vars.iter().any(|v| is_coordinate(v)));
    }
}
