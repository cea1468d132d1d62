//! Single simulation run: `num_requests` sampled requests against one fresh cache.
//!
//! Phases: init (build and optionally prepopulate the cache) → iterate (sample, probe,
//! refresh) → finalize (reduce counters to the configured result).

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cache::{Cache, CacheConfig, EvictionPolicy};
use crate::data::{FeatureCatalog, ItemId};
use crate::error::ConfigError;
use crate::simulation::rng::SimRng;
use crate::simulation::sampler::{Request, WorkloadSampler};
use crate::simulation::weights::WorkloadWeights;

/// Redraw limit for [EmptyFeaturePolicy::Resample], so an all-empty catalog still terminates.
pub const MAX_RESAMPLE_ATTEMPTS: usize = 64;

pub const DEFAULT_NUM_REQUESTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResultMode {
    /// Requests served without a single miss.
    Requests,
    /// Individual item hits.
    Scenes,
    /// Item hits over items requested; 0 when nothing was requested.
    Ratio,
}

/// What an iteration does when the drawn feature maps to no items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EmptyFeaturePolicy {
    /// Consumes one budgeted request and contributes nothing (equivalent to counting a miss).
    ZeroContribution,
    /// Consumes one budgeted request and counts it as free.
    CountAsFree,
    /// Draws again without consuming budget, up to [MAX_RESAMPLE_ATTEMPTS] times.
    Resample,
}

macro_rules! string_enum {
    ($ty:ty, $err:path, { $($variant:path => [$canonical:literal $(, $alias:literal)*]),+ $(,)? }) => {
        impl $ty {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($variant => $canonical,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($canonical $(| $alias)* => Ok($variant),)+
                    _ => Err($err(value.to_string())),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

string_enum!(ResultMode, ConfigError::UnknownResultMode, {
    ResultMode::Requests => ["requests", "free_requests"],
    ResultMode::Scenes => ["scenes", "hits"],
    ResultMode::Ratio => ["ratio"],
});

string_enum!(EmptyFeaturePolicy, ConfigError::UnknownEmptyFeaturePolicy, {
    EmptyFeaturePolicy::ZeroContribution => ["zero", "miss", "zero_contribution"],
    EmptyFeaturePolicy::CountAsFree => ["free", "count_as_free"],
    EmptyFeaturePolicy::Resample => ["resample", "retry"],
});

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_requests: usize,
    pub weights: WorkloadWeights,
    pub result_mode: ResultMode,
    /// Record the resident set after every request. Off for statistical sweeps.
    pub capture_history: bool,
    pub empty_feature_policy: EmptyFeaturePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_requests: DEFAULT_NUM_REQUESTS,
            weights: WorkloadWeights::default(),
            result_mode: ResultMode::Requests,
            capture_history: false,
            empty_feature_policy: EmptyFeaturePolicy::ZeroContribution,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_requests == 0 {
            return Err(ConfigError::NonPositiveParameter {
                field: "simulation.num_requests",
            });
        }
        // Weights are validated on construction; re-check in case of a hand-built triple.
        WorkloadWeights::try_from(self.weights.as_array())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub requests: usize,
    pub free_requests: usize,
    pub empty_requests: usize,
    pub scene_hits: usize,
    pub scenes_requested: usize,
}

impl RunCounters {
    pub fn value(&self, mode: ResultMode) -> f64 {
        match mode {
            ResultMode::Requests => self.free_requests as f64,
            ResultMode::Scenes => self.scene_hits as f64,
            ResultMode::Ratio => {
                if self.scenes_requested == 0 {
                    0.0
                } else {
                    self.scene_hits as f64 / self.scenes_requested as f64
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub mode: ResultMode,
    pub value: f64,
    pub counters: RunCounters,
    /// Resident set after each request, only when history capture was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Vec<ItemId>>>,
}

#[derive(Debug, Clone)]
pub struct SingleRunSimulator<'a> {
    catalog: &'a FeatureCatalog,
    cache: CacheConfig,
    config: SimulationConfig,
}

impl<'a> SingleRunSimulator<'a> {
    pub fn new(
        catalog: &'a FeatureCatalog,
        cache: CacheConfig,
        config: SimulationConfig,
    ) -> Result<Self, ConfigError> {
        cache.validate()?;
        config.validate()?;
        Ok(Self {
            catalog,
            cache,
            config,
        })
    }

    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RunResult, ConfigError> {
        let mut cache = Cache::build(&self.cache, rng)?;
        let sampler = WorkloadSampler::new(self.catalog, self.config.weights)?;

        let mut counters = RunCounters::default();
        let mut history = self
            .config
            .capture_history
            .then(|| Vec::with_capacity(self.config.num_requests));

        for _ in 0..self.config.num_requests {
            let request = self.draw(&sampler, rng);
            self.serve(&mut cache, &request, &mut counters);
            if let Some(history) = history.as_mut() {
                history.push(cache.resident_snapshot());
            }
        }

        Ok(RunResult {
            mode: self.config.result_mode,
            value: counters.value(self.config.result_mode),
            counters,
            history,
        })
    }

    fn draw<R: Rng + ?Sized>(&self, sampler: &WorkloadSampler<'a>, rng: &mut R) -> Request<'a> {
        let mut request = sampler.sample(rng);
        if self.config.empty_feature_policy == EmptyFeaturePolicy::Resample {
            let mut attempts = 0;
            while request.items.is_empty() && attempts < MAX_RESAMPLE_ATTEMPTS {
                request = sampler.sample(rng);
                attempts += 1;
            }
        }
        request
    }

    fn serve(&self, cache: &mut Cache, request: &Request<'_>, counters: &mut RunCounters) {
        counters.requests += 1;
        if request.items.is_empty() {
            counters.empty_requests += 1;
            if self.config.empty_feature_policy == EmptyFeaturePolicy::CountAsFree {
                counters.free_requests += 1;
            }
            return;
        }

        let mut free = true;
        for &item in request.items {
            if cache.get(item) {
                counters.scene_hits += 1;
            } else {
                free = false;
            }
        }
        counters.scenes_requested += request.items.len();
        if free {
            counters.free_requests += 1;
        }
        // Every requested item ends up resident, hit or miss.
        cache.put(request.items);
    }
}

/// Convenience: one seeded run.
pub fn simulate_run(
    catalog: &FeatureCatalog,
    cache: CacheConfig,
    config: SimulationConfig,
    seed: u64,
) -> Result<RunResult, ConfigError> {
    let mut rng = SimRng::new(seed);
    SingleRunSimulator::new(catalog, cache, config)?.run(&mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePolicy;
    use crate::data::Scale;

    fn region_only(num_requests: usize, mode: ResultMode) -> SimulationConfig {
        SimulationConfig {
            num_requests,
            weights: WorkloadWeights::only(Scale::Region),
            result_mode: mode,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn counters_value_guards_zero_items() {
        let counters = RunCounters {
            requests: 3,
            empty_requests: 3,
            ..RunCounters::default()
        };
        assert_eq!(counters.value(ResultMode::Ratio), 0.0);
    }

    #[test]
    fn result_mode_and_empty_policy_parse() {
        assert_eq!("Scenes".parse::<ResultMode>(), Ok(ResultMode::Scenes));
        assert_eq!(
            "hits%".parse::<ResultMode>(),
            Err(ConfigError::UnknownResultMode("hits%".to_string()))
        );
        assert_eq!("retry".parse::<EmptyFeaturePolicy>(), Ok(EmptyFeaturePolicy::Resample));
        assert_eq!(EmptyFeaturePolicy::CountAsFree.to_string(), "free");
    }

    #[test]
    fn zero_requests_is_a_config_error() {
        let catalog = FeatureCatalog::default();
        let err = SingleRunSimulator::new(
            &catalog,
            CacheConfig::default(),
            region_only(0, ResultMode::Requests),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NonPositiveParameter {
                field: "simulation.num_requests"
            }
        );
    }

    #[test]
    fn repeated_feature_becomes_free_once_resident() {
        let catalog = FeatureCatalog::builder()
            .feature(Scale::Region, 0, vec![1, 2, 3])
            .build();
        let result = simulate_run(
            &catalog,
            CacheConfig::new(CachePolicy::Lru, 3),
            region_only(5, ResultMode::Requests),
            7,
        )
        .expect("valid run");
        assert_eq!(result.counters.requests, 5);
        assert_eq!(result.value, 4.0);
        assert_eq!(result.counters.scene_hits, 12);
    }

    #[test]
    fn history_has_one_snapshot_per_request() {
        let catalog = FeatureCatalog::builder()
            .feature(Scale::Region, 0, vec![1, 2])
            .build();
        let config = SimulationConfig {
            capture_history: true,
            ..region_only(3, ResultMode::Requests)
        };
        let result = simulate_run(&catalog, CacheConfig::new(CachePolicy::Ttl, 2), config, 1)
            .expect("valid run");
        let history = result.history.expect("history captured");
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|frame| frame == &vec![1, 2]));
    }
}
