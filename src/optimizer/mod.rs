pub mod export;
pub mod monte_carlo;
pub mod ranking;
pub mod weight_grid;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::error::{ConfigError, SimulationError};
use crate::optimizer::monte_carlo::{MonteCarloAggregator, SimulationPlan, Statistic};
use crate::optimizer::ranking::select_optimum;
use crate::optimizer::weight_grid::{WeightGrid, DEFAULT_WEIGHT_DECIMALS};
use crate::simulation::{derive_seed, SimulationConfig, WorkloadWeights};

pub const DEFAULT_WEIGHT_STEP: f64 = 0.025;

/// Evenly spaced cache parameters, `count` values from `start` to `end` inclusive,
/// truncated to integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub start: usize,
    pub end: usize,
    pub count: usize,
}

impl ParameterRange {
    pub fn values(&self) -> Result<Vec<usize>, ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::NonPositiveParameter {
                field: "sweep.parameter_range.count",
            });
        }
        if self.count == 1 {
            return Ok(vec![self.start]);
        }
        let start = self.start as f64;
        let delta = (self.end as f64 - start) / (self.count - 1) as f64;
        let mut values: Vec<usize> = (0..self.count)
            .map(|index| (start + index as f64 * delta) as usize)
            .collect();
        // The float walk can land just short of `end`.
        if let Some(last) = values.last_mut() {
            *last = self.end;
        }
        Ok(values)
    }
}

impl fmt::Display for ParameterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.end, self.count)
    }
}

impl FromStr for ParameterRange {
    type Err = ConfigError;

    /// `start:end:count`, e.g. `10:800:20`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Invalid {
            field: "sweep.parameter_range",
            reason: format!("expected start:end:count, got '{value}'"),
        };
        let parts: Vec<usize> = value
            .split(':')
            .map(|part| part.trim().parse::<usize>().map_err(|_| invalid()))
            .collect::<Result<_, _>>()?;
        match parts.as_slice() {
            [start, end, count] => Ok(Self {
                start: *start,
                end: *end,
                count: *count,
            }),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Enumerate weights on the simplex at this step. `None` keeps the plan's weights fixed.
    pub weight_step: Option<f64>,
    pub weight_decimals: u32,
    /// Explicit cache parameters; takes precedence over `parameter_range`.
    pub parameter_grid: Vec<usize>,
    pub parameter_range: Option<ParameterRange>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            weight_step: Some(DEFAULT_WEIGHT_STEP),
            weight_decimals: DEFAULT_WEIGHT_DECIMALS,
            parameter_grid: Vec::new(),
            parameter_range: None,
        }
    }
}

impl SweepConfig {
    /// A single point: fixed weights, fixed parameter.
    pub fn single() -> Self {
        Self {
            weight_step: None,
            ..Self::default()
        }
    }

    pub fn weight_points(&self, fixed: WorkloadWeights) -> Result<Vec<WorkloadWeights>, ConfigError> {
        match self.weight_step {
            Some(step) => Ok(WeightGrid::with_decimals(step, self.weight_decimals)?.points()),
            None => Ok(vec![fixed]),
        }
    }

    pub fn parameters(&self, fixed: usize) -> Result<Vec<usize>, ConfigError> {
        let parameters = if !self.parameter_grid.is_empty() {
            self.parameter_grid.clone()
        } else if let Some(range) = self.parameter_range {
            range.values()?
        } else {
            vec![fixed]
        };
        if parameters.contains(&0) {
            return Err(ConfigError::NonPositiveParameter {
                field: "sweep.parameter_grid",
            });
        }
        Ok(parameters)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub weights: WorkloadWeights,
    pub parameter: usize,
    pub statistic: Statistic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub points: Vec<SweepPoint>,
    pub optimum: Option<SweepPoint>,
}

/// Walks weights × parameters, one Monte Carlo aggregation per point.
#[derive(Debug, Clone)]
pub struct SweepDriver {
    aggregator: MonteCarloAggregator,
    plan: SimulationPlan,
    sweep: SweepConfig,
    runs: usize,
    seed: u64,
}

impl SweepDriver {
    pub fn new(
        aggregator: MonteCarloAggregator,
        plan: SimulationPlan,
        sweep: SweepConfig,
        runs: usize,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        plan.validate()?;
        if runs == 0 {
            return Err(ConfigError::NonPositiveParameter { field: "runs" });
        }
        let driver = Self {
            aggregator,
            plan,
            sweep,
            runs,
            seed,
        };
        driver.grid()?;
        Ok(driver)
    }

    /// Every (weights, parameter) pair in processing order: weights outer, parameters inner.
    pub fn grid(&self) -> Result<Vec<(WorkloadWeights, usize)>, ConfigError> {
        let weights = self.sweep.weight_points(self.plan.simulation.weights)?;
        let parameters = self.sweep.parameters(self.plan.cache.parameter)?;
        Ok(weights
            .iter()
            .flat_map(|w| parameters.iter().map(move |p| (*w, *p)))
            .collect())
    }

    pub fn run(&self) -> Result<SweepOutcome, SimulationError> {
        self.run_with_progress(|_, _| {})
    }

    /// Like [SweepDriver::run] but invokes `on_progress(done, total)` after every point.
    pub fn run_with_progress<F>(&self, mut on_progress: F) -> Result<SweepOutcome, SimulationError>
    where
        F: FnMut(usize, usize),
    {
        let grid = self.grid()?;
        let total = grid.len();
        info!(points = total, runs = self.runs, workers = self.aggregator.pool().workers(), "sweep started");
        on_progress(0, total);

        let mut points = Vec::with_capacity(total);
        for (index, (weights, parameter)) in grid.into_iter().enumerate() {
            let span = info_span!("point", index, %weights, parameter);
            let _entered = span.enter();

            let plan = SimulationPlan {
                cache: self.plan.cache.with_parameter(parameter),
                simulation: SimulationConfig {
                    weights,
                    ..self.plan.simulation
                },
            };
            let statistic = self
                .aggregator
                .run(&plan, self.runs, derive_seed(self.seed, index as u64))?;
            info!(
                mean = statistic.mean,
                std_dev = statistic.std_dev,
                std_err = statistic.std_err,
                "point complete"
            );
            points.push(SweepPoint {
                weights,
                parameter,
                statistic,
            });
            on_progress(index + 1, total);
        }

        let optimum = select_optimum(&points);
        if let Some(best) = &optimum {
            info!(weights = %best.weights, parameter = best.parameter, mean = best.statistic.mean, "optimum");
        }
        Ok(SweepOutcome { points, optimum })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::{CacheConfig, CachePolicy};
    use crate::data::{FeatureCatalog, Scale};
    use crate::parallel::WorkerPool;

    fn driver(sweep: SweepConfig) -> SweepDriver {
        let catalog = FeatureCatalog::builder()
            .feature(Scale::Region, 0, vec![1, 2, 3, 4])
            .feature(Scale::State, 0, vec![2, 3])
            .feature(Scale::County, 0, vec![3])
            .feature(Scale::County, 1, vec![7])
            .build();
        let aggregator = MonteCarloAggregator::new(Arc::new(catalog), WorkerPool::with_workers(2).expect("pool"));
        let plan = SimulationPlan {
            cache: CacheConfig::new(CachePolicy::Lru, 4),
            simulation: SimulationConfig {
                num_requests: 20,
                ..SimulationConfig::default()
            },
        };
        SweepDriver::new(aggregator, plan, sweep, 4, 11).expect("valid sweep")
    }

    #[test]
    fn parameter_range_is_inclusive_linspace() {
        let range: ParameterRange = "10:800:20".parse().expect("valid range");
        let values = range.values().expect("non-empty");
        assert_eq!(values.len(), 20);
        assert_eq!(values[0], 10);
        assert_eq!(values[1], 51);
        assert_eq!(values[19], 800);
        assert!("10:800".parse::<ParameterRange>().is_err());
    }

    #[test]
    fn explicit_grid_wins_over_range() {
        let sweep = SweepConfig {
            parameter_grid: vec![3, 5],
            parameter_range: Some(ParameterRange {
                start: 1,
                end: 9,
                count: 9,
            }),
            ..SweepConfig::single()
        };
        assert_eq!(sweep.parameters(250).expect("valid"), vec![3, 5]);
        assert_eq!(SweepConfig::single().parameters(250).expect("valid"), vec![250]);
    }

    #[test]
    fn grid_is_weights_times_parameters() {
        let sweep = SweepConfig {
            weight_step: Some(0.5),
            parameter_grid: vec![1, 4],
            ..SweepConfig::default()
        };
        let driver = driver(sweep);
        let grid = driver.grid().expect("valid grid");
        assert_eq!(grid.len(), 12);
        assert_eq!(grid[0].1, 1);
        assert_eq!(grid[1].1, 4);
    }

    #[test]
    fn sweep_reports_progress_and_optimum() {
        let sweep = SweepConfig {
            weight_step: Some(1.0),
            parameter_grid: vec![1, 4],
            ..SweepConfig::default()
        };
        let driver = driver(sweep);
        let mut progress = Vec::new();
        let outcome = driver
            .run_with_progress(|done, total| progress.push((done, total)))
            .expect("sweep");
        assert_eq!(outcome.points.len(), 6);
        assert_eq!(progress.first(), Some(&(0, 6)));
        assert_eq!(progress.last(), Some(&(6, 6)));
        let best = outcome.optimum.as_ref().expect("optimum");
        assert!(outcome.points.iter().all(|p| p.statistic.mean <= best.statistic.mean));
        assert_eq!(driver.run().expect("rerun"), outcome);
    }

    #[test]
    fn zero_parameter_in_grid_is_rejected() {
        let sweep = SweepConfig {
            parameter_grid: vec![4, 0],
            ..SweepConfig::single()
        };
        assert!(sweep.parameters(250).is_err());
    }
}
