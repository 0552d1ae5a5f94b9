//! Run-wide equation choices.
//!
//! Both enums parse case-insensitively from their display names and
//! deserialize from the same strings, so run configuration files and
//! tabular inputs accept `"euclidean"` as readily as `"Euclidean"`.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Value the exponential decay curve reaches exactly at the buffer edge.
///
/// This is a modelling constant, not a derived one: changing it changes
/// every exponentially decayed score.
pub const EXPONENTIAL_DECAY_CUTOFF: f64 = 1e-6;

/// How exposure and consequence combine into pairwise risk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RiskEquation {
    /// `sqrt(max(E-1,0)^2 + max(C-1,0)^2)`.
    #[default]
    Euclidean,
    /// `E * C`.
    Multiplicative,
}

/// How a stressor's influence falls off inside its buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DecayEquation {
    /// Full strength across the whole buffer.
    #[default]
    None,
    /// Falls linearly to zero at the buffer edge.
    Linear,
    /// Falls exponentially to [`EXPONENTIAL_DECAY_CUTOFF`] at the buffer edge.
    Exponential,
}

/// Error returned when an equation name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} equation '{value}', expected one of: {expected}")]
pub struct UnknownEquation {
    /// Which equation family was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma-separated accepted names.
    pub expected: &'static str,
}

impl RiskEquation {
    /// Display name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Euclidean => "Euclidean",
            Self::Multiplicative => "Multiplicative",
        }
    }
}

impl DecayEquation {
    /// Display name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Linear => "Linear",
            Self::Exponential => "Exponential",
        }
    }
}

impl fmt::Display for RiskEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for DecayEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RiskEquation {
    type Err = UnknownEquation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Self::Euclidean),
            "multiplicative" => Ok(Self::Multiplicative),
            _ => Err(UnknownEquation {
                kind: "risk",
                value: s.to_string(),
                expected: "Euclidean, Multiplicative",
            }),
        }
    }
}

impl FromStr for DecayEquation {
    type Err = UnknownEquation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            _ => Err(UnknownEquation {
                kind: "decay",
                value: s.to_string(),
                expected: "None, Linear, Exponential",
            }),
        }
    }
}

impl<'de> Deserialize<'de> for RiskEquation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for DecayEquation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            "MULTIPLICATIVE".parse::<RiskEquation>(),
            Ok(RiskEquation::Multiplicative)
        );
        assert_eq!(" euclidean ".parse::<RiskEquation>(), Ok(RiskEquation::Euclidean));
        assert_eq!("exponential".parse::<DecayEquation>(), Ok(DecayEquation::Exponential));
        assert_eq!("None".parse::<DecayEquation>(), Ok(DecayEquation::None));
    }

    #[test]
    fn unknown_name_lists_choices() {
        let err = "quadratic".parse::<RiskEquation>().unwrap_err();
        assert_eq!(err.value, "quadratic");
        assert!(err.to_string().contains("Euclidean, Multiplicative"));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for eq in [DecayEquation::None, DecayEquation::Linear, DecayEquation::Exponential] {
            assert_eq!(eq.to_string().parse::<DecayEquation>(), Ok(eq));
        }
    }
}
