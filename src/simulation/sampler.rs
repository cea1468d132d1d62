//! Weighted workload generator: pick a scale by weight, then a feature uniformly.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use crate::data::{FeatureCatalog, FeatureId, ItemId, Scale};
use crate::error::ConfigError;
use crate::simulation::weights::WorkloadWeights;

/// One simulated request. `feature_id` is `None` when the drawn scale has no features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub scale: Scale,
    pub feature_id: Option<FeatureId>,
    pub items: &'a [ItemId],
}

#[derive(Debug, Clone)]
pub struct WorkloadSampler<'a> {
    catalog: &'a FeatureCatalog,
    scales: WeightedIndex<f64>,
}

impl<'a> WorkloadSampler<'a> {
    pub fn new(catalog: &'a FeatureCatalog, weights: WorkloadWeights) -> Result<Self, ConfigError> {
        let scales =
            WeightedIndex::new(weights.as_array()).map_err(|err| ConfigError::InvalidWeights {
                field: "weights",
                reason: err.to_string(),
            })?;
        Ok(Self { catalog, scales })
    }

    /// Every feature of the drawn scale is equally likely, regardless of how many items it maps to.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Request<'a> {
        let scale = Scale::ALL[self.scales.sample(rng)];
        let ids = self.catalog.feature_ids(scale);
        if ids.is_empty() {
            return Request {
                scale,
                feature_id: None,
                items: &[],
            };
        }
        let feature_id = ids[rng.random_range(0..ids.len())];
        Request {
            scale,
            feature_id: Some(feature_id),
            items: self.catalog.lookup(scale, feature_id),
        }
    }
}
