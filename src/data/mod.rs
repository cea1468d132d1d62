pub mod catalog;
pub mod loader;

pub use catalog::{
    synthetic_catalog, CatalogBuilder, FeatureCatalog, FeatureId, FeatureLimits, ItemId, Scale,
};
pub use loader::{catalog_from_csv, catalog_from_json, load_catalog};
