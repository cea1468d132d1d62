//! Read-only feature catalog: per-scale mapping from feature id to the imagery scenes
//! (items) intersecting that feature. Built once per process and shared via `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::simulation::rng::SimRng;

pub type FeatureId = u64;
pub type ItemId = u64;

/// Spatial aggregation level a request targets, coarse to fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scale {
    #[serde(rename = "regions")]
    Region,
    #[serde(rename = "states")]
    State,
    #[serde(rename = "counties")]
    County,
}

impl Scale {
    pub const ALL: [Scale; 3] = [Scale::Region, Scale::State, Scale::County];

    pub const fn index(self) -> usize {
        match self {
            Self::Region => 0,
            Self::State => 1,
            Self::County => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Region => "regions",
            Self::State => "states",
            Self::County => "counties",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scale {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "regions" | "region" | "divisions" | "division" => Ok(Self::Region),
            "states" | "state" => Ok(Self::State),
            "counties" | "county" => Ok(Self::County),
            _ => Err(ConfigError::UnknownScale(value.to_string())),
        }
    }
}

/// Features of one scale, with a dense id list for uniform sampling.
#[derive(Debug, Clone, Default, PartialEq)]
struct ScaleMapping {
    features: BTreeMap<FeatureId, Vec<ItemId>>,
    ids: Vec<FeatureId>,
}

impl ScaleMapping {
    fn from_features(features: BTreeMap<FeatureId, Vec<ItemId>>) -> Self {
        let ids = features.keys().copied().collect();
        Self { features, ids }
    }
}

/// Per-scale cap on how many features (lowest ids first) a catalog keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureLimits {
    pub regions: Option<usize>,
    pub states: Option<usize>,
    pub counties: Option<usize>,
}

impl FeatureLimits {
    pub fn for_scale(&self, scale: Scale) -> Option<usize> {
        match scale {
            Scale::Region => self.regions,
            Scale::State => self.states,
            Scale::County => self.counties,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCatalog {
    scales: [ScaleMapping; 3],
}

impl FeatureCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Items mapped to `feature_id`, or an empty slice when the feature is unknown.
    pub fn lookup(&self, scale: Scale, feature_id: FeatureId) -> &[ItemId] {
        self.scales[scale.index()]
            .features
            .get(&feature_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Feature ids of `scale` in ascending order.
    pub fn feature_ids(&self, scale: Scale) -> &[FeatureId] {
        &self.scales[scale.index()].ids
    }

    pub fn feature_count(&self, scale: Scale) -> usize {
        self.scales[scale.index()].ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.iter().all(|mapping| mapping.ids.is_empty())
    }

    /// One past the largest item id referenced anywhere; the universe prepopulation draws from.
    pub fn item_universe(&self) -> u64 {
        self.scales
            .iter()
            .flat_map(|mapping| mapping.features.values())
            .flatten()
            .max()
            .map_or(0, |max| max + 1)
    }

    pub fn features(&self, scale: Scale) -> impl Iterator<Item = (FeatureId, &[ItemId])> + '_ {
        self.scales[scale.index()]
            .features
            .iter()
            .map(|(id, items)| (*id, items.as_slice()))
    }

    /// Keep only the first N features of each limited scale.
    pub fn truncated(&self, limits: &FeatureLimits) -> FeatureCatalog {
        let mut builder = CatalogBuilder::default();
        for scale in Scale::ALL {
            let limit = limits.for_scale(scale).unwrap_or(usize::MAX);
            for (feature_id, items) in self.features(scale).take(limit) {
                builder = builder.feature(scale, feature_id, items.to_vec());
            }
        }
        builder.build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    scales: [BTreeMap<FeatureId, Vec<ItemId>>; 3],
}

impl CatalogBuilder {
    /// Add or replace a feature. An empty item list is kept as a valid (data gap) feature.
    pub fn feature(mut self, scale: Scale, feature_id: FeatureId, items: Vec<ItemId>) -> Self {
        self.scales[scale.index()].insert(feature_id, items);
        self
    }

    pub fn build(self) -> FeatureCatalog {
        let [regions, states, counties] = self.scales;
        FeatureCatalog {
            scales: [
                ScaleMapping::from_features(regions),
                ScaleMapping::from_features(states),
                ScaleMapping::from_features(counties),
            ],
        }
    }
}

/// Deterministic stand-in catalog for benchmarks and tests. Feature footprints grow with
/// coarseness: a region spans many scenes, a county only a handful.
pub fn synthetic_catalog(feature_counts: [usize; 3], universe: u64, seed: u64) -> FeatureCatalog {
    const MAX_ITEMS_PER_FEATURE: [u64; 3] = [120, 24, 4];

    let mut rng = SimRng::new(seed);
    let universe = universe.max(1);
    let mut builder = CatalogBuilder::default();
    for scale in Scale::ALL {
        let max_items = MAX_ITEMS_PER_FEATURE[scale.index()].min(universe);
        for feature_id in 0..feature_counts[scale.index()] as u64 {
            let len = 1 + rng.below(max_items);
            let start = rng.below(universe);
            let items = (0..len).map(|offset| (start + offset) % universe).collect();
            builder = builder.feature(scale, feature_id, items);
        }
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> FeatureCatalog {
        FeatureCatalog::builder()
            .feature(Scale::Region, 0, vec![10, 11])
            .feature(Scale::State, 3, vec![11, 12])
            .feature(Scale::State, 1, vec![])
            .feature(Scale::County, 7, vec![40])
            .build()
    }

    #[test]
    fn lookup_returns_items_or_empty_slice() {
        let catalog = sample_catalog();
        assert_eq!(catalog.lookup(Scale::Region, 0), &[10, 11]);
        assert!(catalog.lookup(Scale::Region, 99).is_empty());
        assert!(catalog.lookup(Scale::State, 1).is_empty());
    }

    #[test]
    fn feature_ids_are_sorted() {
        let catalog = sample_catalog();
        assert_eq!(catalog.feature_ids(Scale::State), &[1, 3]);
        assert_eq!(catalog.feature_count(Scale::County), 1);
    }

    #[test]
    fn item_universe_is_one_past_max_item() {
        assert_eq!(sample_catalog().item_universe(), 41);
        assert_eq!(FeatureCatalog::default().item_universe(), 0);
    }

    #[test]
    fn truncated_keeps_lowest_ids_per_limited_scale() {
        let catalog = sample_catalog().truncated(&FeatureLimits {
            regions: None,
            states: Some(1),
            counties: Some(0),
        });
        assert_eq!(catalog.feature_ids(Scale::Region), &[0]);
        assert_eq!(catalog.feature_ids(Scale::State), &[1]);
        assert_eq!(catalog.feature_count(Scale::County), 0);
    }

    #[test]
    fn scale_parses_table_names_and_rejects_unknown() {
        assert_eq!("counties".parse::<Scale>(), Ok(Scale::County));
        assert_eq!("Region".parse::<Scale>(), Ok(Scale::Region));
        assert_eq!(
            "tracts".parse::<Scale>(),
            Err(ConfigError::UnknownScale("tracts".to_string()))
        );
    }

    #[test]
    fn synthetic_catalog_is_deterministic_and_bounded() {
        let a = synthetic_catalog([6, 49, 200], 886, 7);
        let b = synthetic_catalog([6, 49, 200], 886, 7);
        assert_eq!(a, b);
        assert_eq!(a.feature_count(Scale::County), 200);
        assert!(a.item_universe() <= 886);
        for scale in Scale::ALL {
            assert!(a.features(scale).all(|(_, items)| !items.is_empty()));
        }
    }
}
