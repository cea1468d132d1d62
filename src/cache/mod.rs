//! Hot-layer cache: one contract, three eviction policies chosen at construction time.
//!
//! - [LruPolicy]: capacity-bounded recency eviction.
//! - [TtlPolicy]: every `put` ages residents by one tick; entries expire at zero.
//! - [HybridPolicy]: TTL ageing plus a hard capacity bound (oldest insertion evicted).

pub mod hybrid;
pub mod lru;
pub mod ttl;

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::ItemId;
use crate::error::ConfigError;

pub use hybrid::HybridPolicy;
pub use lru::LruPolicy;
pub use ttl::TtlPolicy;

/// Default number of scenes in the cold layer (distinct Landsat footprints over the USA).
pub const DEFAULT_UNIVERSE_SIZE: u64 = 886;
pub const DEFAULT_CAPACITY: usize = 250;
/// Life span used by [HybridPolicy] when none is configured.
pub const DEFAULT_HYBRID_EXPIRATION: u32 = 10;

pub trait EvictionPolicy {
    /// Hit or miss. Only LRU reorders on a hit.
    fn get(&mut self, item: ItemId) -> bool;

    /// Insert or refresh every listed item. Duplicates within one call are harmless and an
    /// empty slice changes nothing.
    fn put(&mut self, items: &[ItemId]);

    /// Residency check without side effects.
    fn contains(&self, item: ItemId) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resident_snapshot(&self) -> Vec<ItemId>;

    /// Remaining `put` cycles before expiry; `None` for policies without counters.
    fn remaining_life(&self, item: ItemId) -> Option<u32>;

    /// Load residents before the first request, without ageing anything.
    fn seed(&mut self, items: &[ItemId]);
}

/// Age every entry by one tick and drop the ones that reach zero. Order is preserved.
pub(crate) fn decay(entries: &mut IndexMap<ItemId, u32>) {
    entries.retain(|_, life| {
        *life = life.saturating_sub(1);
        *life > 0
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CachePolicy {
    Lru,
    Ttl,
    Hybrid,
}

impl CachePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lru => "lru",
            Self::Ttl => "ttl",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CachePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lru" | "lrucache" => Ok(Self::Lru),
            "ttl" | "time" | "timecache" => Ok(Self::Ttl),
            "hybrid" | "combination" | "combinationcache" => Ok(Self::Hybrid),
            _ => Err(ConfigError::UnknownPolicy(value.to_string())),
        }
    }
}

impl TryFrom<String> for CachePolicy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CachePolicy> for String {
    fn from(policy: CachePolicy) -> Self {
        policy.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub policy: CachePolicy,
    /// Capacity for LRU and Hybrid, life span in `put` cycles for TTL.
    pub parameter: usize,
    /// Hybrid life span in `put` cycles. Ignored by the other policies.
    pub expiration: u32,
    pub prepopulate: bool,
    /// Item ids drawn for prepopulation come from `0..universe_size`.
    pub universe_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            policy: CachePolicy::Lru,
            parameter: DEFAULT_CAPACITY,
            expiration: DEFAULT_HYBRID_EXPIRATION,
            prepopulate: false,
            universe_size: DEFAULT_UNIVERSE_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn new(policy: CachePolicy, parameter: usize) -> Self {
        Self {
            policy,
            parameter,
            ..Self::default()
        }
    }

    pub fn with_parameter(self, parameter: usize) -> Self {
        Self { parameter, ..self }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parameter == 0 {
            return Err(ConfigError::NonPositiveParameter {
                field: "cache.parameter",
            });
        }
        if self.policy == CachePolicy::Ttl && u32::try_from(self.parameter).is_err() {
            return Err(ConfigError::Invalid {
                field: "cache.parameter",
                reason: format!("life span {} exceeds {}", self.parameter, u32::MAX),
            });
        }
        if self.policy == CachePolicy::Hybrid && self.expiration == 0 {
            return Err(ConfigError::NonPositiveParameter {
                field: "cache.expiration",
            });
        }
        if self.prepopulate && self.universe_size == 0 {
            return Err(ConfigError::NonPositiveParameter {
                field: "cache.universe_size",
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum Cache {
    Lru(LruPolicy),
    Ttl(TtlPolicy),
    Hybrid(HybridPolicy),
}

impl Cache {
    /// Empty cache for `config`.
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.parameter).ok_or(ConfigError::NonPositiveParameter {
            field: "cache.parameter",
        })?;
        Ok(match config.policy {
            CachePolicy::Lru => Cache::Lru(LruPolicy::new(capacity)),
            CachePolicy::Ttl => {
                let life_span =
                    u32::try_from(config.parameter).map_err(|_| ConfigError::Invalid {
                        field: "cache.parameter",
                        reason: format!("life span {} exceeds {}", config.parameter, u32::MAX),
                    })?;
                Cache::Ttl(TtlPolicy::new(life_span))
            }
            CachePolicy::Hybrid => {
                Cache::Hybrid(HybridPolicy::new(capacity.get(), config.expiration))
            }
        })
    }

    /// Fresh cache, prepopulated when `config.prepopulate` is set.
    pub fn build<R: Rng + ?Sized>(config: &CacheConfig, rng: &mut R) -> Result<Self, ConfigError> {
        let mut cache = Self::new(config)?;
        if config.prepopulate {
            let keys = prepopulation_keys(rng, config.universe_size, config.parameter);
            cache.seed(&keys);
        }
        Ok(cache)
    }

    pub fn policy(&self) -> CachePolicy {
        match self {
            Cache::Lru(_) => CachePolicy::Lru,
            Cache::Ttl(_) => CachePolicy::Ttl,
            Cache::Hybrid(_) => CachePolicy::Hybrid,
        }
    }

    fn inner(&self) -> &dyn EvictionPolicy {
        match self {
            Cache::Lru(policy) => policy,
            Cache::Ttl(policy) => policy,
            Cache::Hybrid(policy) => policy,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn EvictionPolicy {
        match self {
            Cache::Lru(policy) => policy,
            Cache::Ttl(policy) => policy,
            Cache::Hybrid(policy) => policy,
        }
    }
}

impl EvictionPolicy for Cache {
    fn get(&mut self, item: ItemId) -> bool {
        self.inner_mut().get(item)
    }

    fn put(&mut self, items: &[ItemId]) {
        self.inner_mut().put(items)
    }

    fn contains(&self, item: ItemId) -> bool {
        self.inner().contains(item)
    }

    fn len(&self) -> usize {
        self.inner().len()
    }

    fn resident_snapshot(&self) -> Vec<ItemId> {
        self.inner().resident_snapshot()
    }

    fn remaining_life(&self, item: ItemId) -> Option<u32> {
        self.inner().remaining_life(item)
    }

    fn seed(&mut self, items: &[ItemId]) {
        self.inner_mut().seed(items)
    }
}

/// `count` distinct ids drawn uniformly from `0..universe_size` (fewer if the universe is smaller).
pub fn prepopulation_keys<R: Rng + ?Sized>(
    rng: &mut R,
    universe_size: u64,
    count: usize,
) -> Vec<ItemId> {
    let universe = usize::try_from(universe_size).unwrap_or(usize::MAX);
    let amount = count.min(universe);
    rand::seq::index::sample(rng, universe, amount)
        .into_iter()
        .map(|index| index as ItemId)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::rng::SimRng;

    #[test]
    fn policy_names_parse_case_insensitively() {
        assert_eq!("LRU".parse::<CachePolicy>(), Ok(CachePolicy::Lru));
        assert_eq!("TimeCache".parse::<CachePolicy>(), Ok(CachePolicy::Ttl));
        assert_eq!("CombinationCache".parse::<CachePolicy>(), Ok(CachePolicy::Hybrid));
        assert_eq!(
            "fifo".parse::<CachePolicy>(),
            Err(ConfigError::UnknownPolicy("fifo".to_string()))
        );
    }

    #[test]
    fn policy_deserialize_reports_unknown_name() {
        let err = serde_json::from_str::<CachePolicy>("\"arc\"").unwrap_err();
        assert!(err.to_string().contains("unknown cache policy 'arc'"), "got: {err}");
    }

    #[test]
    fn zero_parameter_is_rejected_with_field_name() {
        let err = Cache::new(&CacheConfig::new(CachePolicy::Lru, 0)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NonPositiveParameter {
                field: "cache.parameter"
            }
        );
    }

    #[test]
    fn hybrid_requires_positive_expiration() {
        let config = CacheConfig {
            expiration: 0,
            ..CacheConfig::new(CachePolicy::Hybrid, 5)
        };
        assert!(matches!(
            Cache::new(&config),
            Err(ConfigError::NonPositiveParameter {
                field: "cache.expiration"
            })
        ));
    }

    #[test]
    fn build_dispatches_on_policy() {
        let mut rng = SimRng::new(1);
        for policy in [CachePolicy::Lru, CachePolicy::Ttl, CachePolicy::Hybrid] {
            let cache = Cache::build(&CacheConfig::new(policy, 4), &mut rng).expect("valid");
            assert_eq!(cache.policy(), policy);
            assert!(cache.is_empty());
        }
    }

    #[test]
    fn prepopulation_fills_to_parameter_with_distinct_keys() {
        let mut rng = SimRng::new(9);
        let config = CacheConfig {
            prepopulate: true,
            universe_size: 100,
            ..CacheConfig::new(CachePolicy::Hybrid, 20)
        };
        let cache = Cache::build(&config, &mut rng).expect("valid");
        let mut residents = cache.resident_snapshot();
        assert_eq!(residents.len(), 20);
        assert!(residents.iter().all(|item| *item < 100));
        residents.sort_unstable();
        residents.dedup();
        assert_eq!(residents.len(), 20);
        assert_eq!(cache.remaining_life(residents[0]), Some(DEFAULT_HYBRID_EXPIRATION));
    }

    #[test]
    fn prepopulation_is_clamped_to_universe() {
        let mut rng = SimRng::new(2);
        assert_eq!(prepopulation_keys(&mut rng, 5, 50).len(), 5);
    }
}
