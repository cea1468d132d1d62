use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, Span};

use crate::cache::CacheConfig;
use crate::data::FeatureCatalog;
use crate::error::{ConfigError, SimulationError};
use crate::parallel::WorkerPool;
use crate::simulation::{derive_seed, SimRng, SimulationConfig, SingleRunSimulator};

/// Mean and spread of one grid point's run outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistic {
    pub mean: f64,
    /// Population standard deviation (divides by `runs`).
    pub std_dev: f64,
    pub std_err: f64,
    pub runs: usize,
}

impl Statistic {
    /// Reduce run outcomes. Samples are sorted first, so the result does not depend on the
    /// order runs completed in. `None` for an empty slice.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        Some(Self {
            mean,
            std_dev,
            std_err: std_dev / n.sqrt(),
            runs: sorted.len(),
        })
    }
}

/// Cache and workload settings shared by every run of one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationPlan {
    pub cache: CacheConfig,
    pub simulation: SimulationConfig,
}

impl SimulationPlan {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.simulation.validate()
    }
}

/// Runs independent simulations on a reusable worker pool and reduces them to a [Statistic].
#[derive(Debug, Clone)]
pub struct MonteCarloAggregator {
    catalog: Arc<FeatureCatalog>,
    pool: WorkerPool,
}

impl MonteCarloAggregator {
    pub fn new(catalog: Arc<FeatureCatalog>, pool: WorkerPool) -> Self {
        Self { catalog, pool }
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// `num_runs` parallel runs of `plan`. Run `i` draws from `derive_seed(base_seed, i)`.
    pub fn run(
        &self,
        plan: &SimulationPlan,
        num_runs: usize,
        base_seed: u64,
    ) -> Result<Statistic, SimulationError> {
        self.run_with_parallelism(plan, num_runs, base_seed, true)
    }

    /// Like [MonteCarloAggregator::run] but on the calling thread. Same seeds, same result.
    pub fn run_sequential(
        &self,
        plan: &SimulationPlan,
        num_runs: usize,
        base_seed: u64,
    ) -> Result<Statistic, SimulationError> {
        self.run_with_parallelism(plan, num_runs, base_seed, false)
    }

    fn run_with_parallelism(
        &self,
        plan: &SimulationPlan,
        num_runs: usize,
        base_seed: u64,
        parallel: bool,
    ) -> Result<Statistic, SimulationError> {
        plan.validate()?;
        let catalog = self.catalog.as_ref();
        let run_one = |_run: usize, rng: &mut SimRng| {
            let simulator = SingleRunSimulator::new(catalog, plan.cache, plan.simulation)?;
            simulator.run(rng).map(|result| result.value)
        };
        if parallel {
            self.aggregate(num_runs, base_seed, run_one)
        } else {
            aggregate_sequential(num_runs, base_seed, run_one)
        }
    }

    /// Generic reduction behind [MonteCarloAggregator::run]: call `run_one` for every run index
    /// with its own RNG stream, wait for all of them, then reduce. The first failing run cancels
    /// the rest and is reported; no partial statistic is ever returned.
    pub fn aggregate<F>(
        &self,
        num_runs: usize,
        base_seed: u64,
        run_one: F,
    ) -> Result<Statistic, SimulationError>
    where
        F: Fn(usize, &mut SimRng) -> Result<f64, ConfigError> + Sync,
    {
        check_runs(num_runs)?;
        let parent = Span::current();
        let samples = self.pool.install(|| {
            (0..num_runs)
                .into_par_iter()
                .map(|run| execute_run(&parent, run, base_seed, &run_one))
                .collect::<Result<Vec<f64>, SimulationError>>()
        })?;
        reduce(&samples)
    }
}

fn aggregate_sequential<F>(
    num_runs: usize,
    base_seed: u64,
    run_one: F,
) -> Result<Statistic, SimulationError>
where
    F: Fn(usize, &mut SimRng) -> Result<f64, ConfigError>,
{
    check_runs(num_runs)?;
    let parent = Span::current();
    let samples = (0..num_runs)
        .map(|run| execute_run(&parent, run, base_seed, &run_one))
        .collect::<Result<Vec<f64>, SimulationError>>()?;
    reduce(&samples)
}

fn execute_run<F>(parent: &Span, run: usize, base_seed: u64, run_one: &F) -> Result<f64, SimulationError>
where
    F: Fn(usize, &mut SimRng) -> Result<f64, ConfigError>,
{
    let _span = debug_span!(parent: parent, "run", run).entered();
    let mut rng = SimRng::new(derive_seed(base_seed, run as u64));
    let value = run_one(run, &mut rng).map_err(|source| SimulationError::RunFailed { run, source })?;
    debug!(value, "run complete");
    Ok(value)
}

fn check_runs(num_runs: usize) -> Result<(), ConfigError> {
    if num_runs == 0 {
        return Err(ConfigError::NonPositiveParameter { field: "runs" });
    }
    Ok(())
}

fn reduce(samples: &[f64]) -> Result<Statistic, SimulationError> {
    Statistic::from_samples(samples)
        .ok_or_else(|| ConfigError::NonPositiveParameter { field: "runs" }.into())
}
