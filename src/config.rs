//! YAML run file: which catalog to load, how to simulate, what to sweep.
//!
//! Every field is optional; omitted fields take the defaults used by the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::CacheConfig;
use crate::data::{load_catalog, synthetic_catalog, FeatureCatalog, FeatureLimits};
use crate::error::{CatalogError, ConfigError, ConfigFileError, SimulationError};
use crate::optimizer::monte_carlo::{MonteCarloAggregator, SimulationPlan};
use crate::optimizer::{SweepConfig, SweepDriver};
use crate::parallel::{workers_from_env, WorkerPool};
use crate::simulation::SimulationConfig;

/// Feature counts and universe of the catalog used when no file is given.
pub const SYNTHETIC_FEATURE_COUNTS: [usize; 3] = [6, 49, 400];

pub fn default_runs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// JSON or CSV mapping file. Without one a seeded synthetic catalog is generated.
    pub catalog: Option<PathBuf>,
    pub feature_limits: FeatureLimits,
    pub cache: CacheConfig,
    pub simulation: SimulationConfig,
    pub sweep: SweepConfig,
    pub runs: usize,
    pub seed: u64,
    /// Worker threads; `0` uses every core. `HOTLAYER_WORKERS` overrides.
    pub workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            feature_limits: FeatureLimits::default(),
            cache: CacheConfig::default(),
            simulation: SimulationConfig::default(),
            sweep: SweepConfig::default(),
            runs: default_runs(),
            seed: 0,
            workers: 0,
        }
    }
}

impl RunConfig {
    pub fn plan(&self) -> SimulationPlan {
        SimulationPlan {
            cache: self.cache,
            simulation: self.simulation,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plan().validate()?;
        if self.runs == 0 {
            return Err(ConfigError::NonPositiveParameter { field: "runs" });
        }
        self.sweep.weight_points(self.simulation.weights)?;
        self.sweep.parameters(self.cache.parameter)?;
        Ok(())
    }

    pub fn effective_workers(&self) -> usize {
        workers_from_env(self.workers)
    }

    /// Load the configured catalog, or build the synthetic one from `seed`, then apply limits.
    pub fn load_catalog(&self) -> Result<FeatureCatalog, CatalogError> {
        let catalog = match &self.catalog {
            Some(path) => load_catalog(path)?,
            None => synthetic_catalog(SYNTHETIC_FEATURE_COUNTS, self.cache.universe_size, self.seed),
        };
        Ok(catalog.truncated(&self.feature_limits))
    }

    pub fn aggregator(&self, catalog: Arc<FeatureCatalog>) -> Result<MonteCarloAggregator, SimulationError> {
        let pool = WorkerPool::with_workers(self.effective_workers())?;
        Ok(MonteCarloAggregator::new(catalog, pool))
    }

    pub fn sweep_driver(&self, catalog: Arc<FeatureCatalog>) -> Result<SweepDriver, SimulationError> {
        let aggregator = self.aggregator(catalog)?;
        Ok(SweepDriver::new(
            aggregator,
            self.plan(),
            self.sweep.clone(),
            self.runs,
            self.seed,
        )?)
    }
}

pub fn parse_run_config(raw: &str) -> Result<RunConfig, serde_yaml::Error> {
    serde_yaml::from_str(raw)
}

pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig, ConfigFileError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_run_config(&raw).map_err(|source| ConfigFileError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    debug!(path = %path.display(), ?config, "run config loaded");
    Ok(config)
}
