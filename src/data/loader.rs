//! Load a pre-computed feature → scenes mapping from disk.
//!
//! Two shapes are accepted:
//! - JSON: `{"regions": {"0": [1, 2]}, "states": {...}, "counties": {...}}`
//! - CSV: header `scale,feature_id,items`, where `items` is the comma-joined scene list
//!   (the `feature_index, landsat_FIDs` mapping-table layout).

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::data::catalog::{CatalogBuilder, FeatureCatalog, FeatureId, ItemId, Scale};
use crate::error::CatalogError;

/// Load a catalog, picking the parser from the file extension.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<FeatureCatalog, CatalogError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let catalog = match extension.as_deref() {
        Some("json") => {
            let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            catalog_from_json(&raw)?
        }
        Some("csv") => {
            let file = fs::File::open(path).map_err(|source| CatalogError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            catalog_from_csv(file)?
        }
        _ => return Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
    };

    info!(
        path = %path.display(),
        regions = catalog.feature_count(Scale::Region),
        states = catalog.feature_count(Scale::State),
        counties = catalog.feature_count(Scale::County),
        "catalog loaded"
    );
    Ok(catalog)
}

pub fn catalog_from_json(input: &str) -> Result<FeatureCatalog, CatalogError> {
    let raw: BTreeMap<String, BTreeMap<FeatureId, Vec<ItemId>>> = serde_json::from_str(input)?;
    let mut builder = CatalogBuilder::default();
    for (scale_name, features) in raw {
        let scale: Scale = scale_name.parse()?;
        for (feature_id, items) in features {
            builder = builder.feature(scale, feature_id, items);
        }
    }
    Ok(builder.build())
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    scale: String,
    feature_id: FeatureId,
    #[serde(default)]
    items: String,
}

pub fn catalog_from_csv<R: Read>(reader: R) -> Result<FeatureCatalog, CatalogError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut builder = CatalogBuilder::default();
    for row in reader.deserialize::<CatalogRow>() {
        let row = row?;
        let scale: Scale = row.scale.parse()?;
        let items = parse_item_list(row.feature_id, &row.items)?;
        builder = builder.feature(scale, row.feature_id, items);
    }
    Ok(builder.build())
}

/// Split a comma-joined scene list. Blank entries are skipped so "" maps to an empty feature.
fn parse_item_list(feature_id: FeatureId, raw: &str) -> Result<Vec<ItemId>, CatalogError> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value.parse::<ItemId>().map_err(|_| CatalogError::InvalidItem {
                feature_id,
                value: value.to_string(),
            })
        })
        .collect()
}
