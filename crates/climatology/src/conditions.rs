//! Condition catalog: which variable and percentile defines each condition.

use gldas_common::variables::{AIR_TEMPERATURE, PRECIPITATION_RATE, WIND_SPEED};
use serde::{Deserialize, Serialize};

/// Extreme-weather condition evaluated against the seasonal climatology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    VeryHot,
    VeryCold,
    VeryWet,
    VeryWindy,
    VeryUncomfortable,
}

/// Which side of the threshold counts as an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exceedance {
    AtOrAbove,
    AtOrBelow,
}

impl Exceedance {
    pub fn occurs(&self, value: f64, threshold: f64) -> bool {
        match self {
            Exceedance::AtOrAbove => value >= threshold,
            Exceedance::AtOrBelow => value <= threshold,
        }
    }
}

/// Seasonal series a condition is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionSource {
    /// A dataset variable as stored.
    Variable(&'static str),
    /// Heat index derived from temperature and relative humidity.
    HeatIndex,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::VeryHot,
        Condition::VeryCold,
        Condition::VeryWet,
        Condition::VeryWindy,
        Condition::VeryUncomfortable,
    ];

    /// Percentile of the seasonal samples used as the threshold.
    pub fn percentile(&self) -> f64 {
        match self {
            Condition::VeryHot => 95.0,
            Condition::VeryCold => 5.0,
            Condition::VeryWet => 90.0,
            Condition::VeryWindy => 85.0,
            Condition::VeryUncomfortable => 90.0,
        }
    }

    pub fn exceedance(&self) -> Exceedance {
        match self {
            Condition::VeryCold => Exceedance::AtOrBelow,
            _ => Exceedance::AtOrAbove,
        }
    }

    pub fn source(&self) -> ConditionSource {
        match self {
            Condition::VeryHot | Condition::VeryCold => ConditionSource::Variable(AIR_TEMPERATURE),
            Condition::VeryWet => ConditionSource::Variable(PRECIPITATION_RATE),
            Condition::VeryWindy => ConditionSource::Variable(WIND_SPEED),
            Condition::VeryUncomfortable => ConditionSource::HeatIndex,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::VeryHot => "very_hot",
            Condition::VeryCold => "very_cold",
            Condition::VeryWet => "very_wet",
            Condition::VeryWindy => "very_windy",
            Condition::VeryUncomfortable => "very_uncomfortable",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold per condition; `None` when the condition had no samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityThresholds {
    pub very_hot: Option<f64>,
    pub very_cold: Option<f64>,
    pub very_wet: Option<f64>,
    pub very_windy: Option<f64>,
    pub very_uncomfortable: Option<f64>,
}

impl ProbabilityThresholds {
    pub fn get(&self, condition: Condition) -> Option<f64> {
        match condition {
            Condition::VeryHot => self.very_hot,
            Condition::VeryCold => self.very_cold,
            Condition::VeryWet => self.very_wet,
            Condition::VeryWindy => self.very_windy,
            Condition::VeryUncomfortable => self.very_uncomfortable,
        }
    }

    pub fn set(&mut self, condition: Condition, threshold: f64) {
        let slot = match condition {
            Condition::VeryHot => &mut self.very_hot,
            Condition::VeryCold => &mut self.very_cold,
            Condition::VeryWet => &mut self.very_wet,
            Condition::VeryWindy => &mut self.very_windy,
            Condition::VeryUncomfortable => &mut self.very_uncomfortable,
        };
        *slot = Some(threshold);
    }
}
