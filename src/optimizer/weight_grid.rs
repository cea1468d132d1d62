//! Enumerate request-mix weights on the 2-simplex at a fixed step.
//!
//! Components are accumulated as `index * step`, so raw sums drift away from 1. Each component
//! is rounded to `decimals` places first and a triple is kept only when the rounded values sum
//! to exactly 1.0 and each lies in `[0, 1]`.

use crate::error::ConfigError;
use crate::simulation::WorkloadWeights;

pub const DEFAULT_WEIGHT_DECIMALS: u32 = 2;
const MAX_WEIGHT_DECIMALS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightGrid {
    step: f64,
    decimals: u32,
}

impl WeightGrid {
    pub fn new(step: f64) -> Result<Self, ConfigError> {
        Self::with_decimals(step, DEFAULT_WEIGHT_DECIMALS)
    }

    pub fn with_decimals(step: f64, decimals: u32) -> Result<Self, ConfigError> {
        if !step.is_finite() || step <= 0.0 || step > 1.0 {
            return Err(ConfigError::InvalidStep(step));
        }
        if decimals > MAX_WEIGHT_DECIMALS {
            return Err(ConfigError::Invalid {
                field: "sweep.weight_decimals",
                reason: format!("{decimals} exceeds {MAX_WEIGHT_DECIMALS}"),
            });
        }
        Ok(Self { step, decimals })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Fresh iterator from the start; the same grid always yields the same sequence.
    pub fn iter(&self) -> WeightGridIter {
        WeightGridIter {
            step: self.step,
            factor: 10f64.powi(self.decimals as i32),
            outer: 0,
            outer_len: arange_len(1.0 + self.step, self.step),
            inner: 0,
        }
    }

    pub fn points(&self) -> Vec<WorkloadWeights> {
        self.iter().collect()
    }
}

impl IntoIterator for &WeightGrid {
    type Item = WorkloadWeights;
    type IntoIter = WeightGridIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct WeightGridIter {
    step: f64,
    factor: f64,
    outer: usize,
    outer_len: usize,
    inner: usize,
}

impl WeightGridIter {
    fn round(&self, value: f64) -> f64 {
        // Ties go to even (2.5 -> 2); `+ 0.0` folds a rounded -0.0 into 0.0.
        (value * self.factor).round_ties_even() / self.factor + 0.0
    }

    fn keep(&self, i: f64, j: f64, k: f64) -> Option<WorkloadWeights> {
        let rounded = [self.round(i), self.round(j), self.round(k)];
        let in_range = rounded.iter().all(|w| (0.0..=1.0).contains(w));
        let exact_sum = rounded[0] + rounded[1] + rounded[2] == 1.0;
        if in_range && exact_sum {
            WorkloadWeights::try_from(rounded).ok()
        } else {
            None
        }
    }
}

impl Iterator for WeightGridIter {
    type Item = WorkloadWeights;

    fn next(&mut self) -> Option<Self::Item> {
        while self.outer < self.outer_len {
            let i = self.outer as f64 * self.step;
            let inner_len = arange_len(1.0 - i + self.step, self.step);
            while self.inner < inner_len {
                let j = self.inner as f64 * self.step;
                self.inner += 1;
                if let Some(weights) = self.keep(i, j, 1.0 - i - j) {
                    return Some(weights);
                }
            }
            self.outer += 1;
            self.inner = 0;
        }
        None
    }
}

/// Number of values in `0, step, 2*step, ...` strictly below `stop`.
fn arange_len(stop: f64, step: f64) -> usize {
    if stop <= 0.0 {
        return 0;
    }
    (stop / step).ceil() as usize
}
