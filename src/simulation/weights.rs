//! Request-mix weights over the three scales.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::Scale;
use crate::error::ConfigError;

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

const FIELDS: [&str; 3] = ["weights.regions", "weights.states", "weights.counties"];

/// Probability of a request targeting each scale, in [Scale::ALL] order.
/// Always a valid distribution: components in `[0, 1]` summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 3]", into = "[f64; 3]")]
pub struct WorkloadWeights([f64; 3]);

impl WorkloadWeights {
    pub fn new(regions: f64, states: f64, counties: f64) -> Result<Self, ConfigError> {
        Self::try_from([regions, states, counties])
    }

    /// All requests target one scale.
    pub fn only(scale: Scale) -> Self {
        let mut weights = [0.0; 3];
        weights[scale.index()] = 1.0;
        Self(weights)
    }

    pub fn for_scale(&self, scale: Scale) -> f64 {
        self.0[scale.index()]
    }

    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }
}

impl Default for WorkloadWeights {
    fn default() -> Self {
        Self([0.05, 0.2, 0.75])
    }
}

impl TryFrom<[f64; 3]> for WorkloadWeights {
    type Error = ConfigError;

    fn try_from(weights: [f64; 3]) -> Result<Self, Self::Error> {
        for (weight, field) in weights.iter().zip(FIELDS) {
            if !weight.is_finite() || !(0.0..=1.0).contains(weight) {
                return Err(ConfigError::InvalidWeights {
                    field,
                    reason: format!("{weight} is outside [0, 1]"),
                });
            }
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidWeights {
                field: "weights",
                reason: format!("components sum to {sum}, expected 1"),
            });
        }
        Ok(Self(weights))
    }
}

impl From<WorkloadWeights> for [f64; 3] {
    fn from(weights: WorkloadWeights) -> Self {
        weights.0
    }
}

impl FromStr for WorkloadWeights {
    type Err = ConfigError;

    /// Parses `"regions,states,counties"`, e.g. `"0.05,0.2,0.75"`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        let [regions, states, counties] = parts.as_slice() else {
            return Err(ConfigError::InvalidWeights {
                field: "weights",
                reason: format!("expected three comma-separated values, got '{value}'"),
            });
        };
        let mut parsed = [0.0; 3];
        for ((slot, raw), field) in parsed.iter_mut().zip([regions, states, counties]).zip(FIELDS) {
            *slot = raw.parse().map_err(|_| ConfigError::InvalidWeights {
                field,
                reason: format!("'{raw}' is not a number"),
            })?;
        }
        Self::try_from(parsed)
    }
}

impl fmt::Display for WorkloadWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [regions, states, counties] = self.0;
        write!(f, "({regions}, {states}, {counties})")
    }
}
