// SPDX-License-Identifier: MIT OR Apache-2.0

//! Numeric tolerance comparison.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How far a submitted value may sit from the target and still count.
///
/// A percentage tolerance scales with the magnitude of the target, so
/// `Percent(1.0)` accepts within 1% of it; a zero target then demands an
/// exact match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tolerance {
    Absolute(f64),
    Percent(f64),
}

impl Tolerance {
    /// Whether `value` is acceptably close to `target`. NaN never is.
    pub fn admits(&self, target: f64, value: f64) -> bool {
        (value - target).abs() <= self.margin(target)
    }

    /// The absolute margin around a target.
    pub fn margin(&self, target: f64) -> f64 {
        match self {
            Tolerance::Absolute(tolerance) => tolerance.abs(),
            Tolerance::Percent(percent) => (percent.abs() / 100.0) * target.abs(),
        }
    }

    /// A tolerance widened by `factor`, for partial-credit bands.
    pub fn scaled(&self, factor: f64) -> Self {
        match self {
            Tolerance::Absolute(tolerance) => Tolerance::Absolute(tolerance * factor),
            Tolerance::Percent(percent) => Tolerance::Percent(percent * factor),
        }
    }
}

impl Default for Tolerance {
    /// The ancestral default of CAPA problems.
    fn default() -> Self {
        Tolerance::Percent(0.01)
    }
}

impl FromStr for Tolerance {
    type Err = ToleranceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Some(percent) = trimmed.strip_suffix('%') {
            let percent: f64 = percent
                .trim()
                .parse()
                .map_err(|_| ToleranceError(value.to_owned()))?;
            return Ok(Tolerance::Percent(percent));
        }
        let absolute: f64 = trimmed
            .parse()
            .map_err(|_| ToleranceError(value.to_owned()))?;
        Ok(Tolerance::Absolute(absolute))
    }
}

impl std::fmt::Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tolerance::Absolute(tolerance) => write!(f, "{}", tolerance),
            Tolerance::Percent(percent) => write!(f, "{}%", percent),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid tolerance {0:?}")]
pub struct ToleranceError(String);

// Tolerances are written as strings in problem definitions: "0.01" or "3%".
impl Serialize for Tolerance {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tolerance {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::Tolerance;

    #[test]
    fn absolute_band() {
        let tolerance = Tolerance::Absolute(0.01);
        assert!(tolerance.admits(3.14, 3.145));
        assert!(tolerance.admits(3.14, 3.15));
        assert!(!tolerance.admits(3.14, 3.16));
    }

    #[test]
    fn percentage_scales_with_target() {
        let tolerance = Tolerance::Percent(1.0);
        assert!(tolerance.admits(100.0, 100.9));
        assert!(!tolerance.admits(100.0, 101.1));
        assert!(tolerance.admits(1000.0, 1009.0));

        // Zero target demands exactness.
        assert!(tolerance.admits(0.0, 0.0));
        assert!(!tolerance.admits(0.0, 0.001));
    }

    #[test]
    fn nan_never_admits() {
        let tolerance = Tolerance::Absolute(1.0);
        assert!(!tolerance.admits(1.0, f64::NAN));
    }

    #[test]
    fn parses_both_forms() {
        assert_eq!("0.5".parse::<Tolerance>().unwrap(), Tolerance::Absolute(0.5));
        assert_eq!("3%".parse::<Tolerance>().unwrap(), Tolerance::Percent(3.0));
        assert!("wide".parse::<Tolerance>().is_err());
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&Tolerance::Percent(2.5)).unwrap();
        assert_eq!(json, "\"2.5%\"");
        let back: Tolerance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Tolerance::Percent(2.5));
    }
}
