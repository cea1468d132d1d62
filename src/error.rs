//! Error taxonomy for the simulation engine.
//!
//! Configuration problems are fatal and surface before any run starts. Data gaps
//! (features without mapped items) are not errors at all; see
//! [crate::simulation::EmptyFeaturePolicy].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown cache policy '{0}' (expected lru, ttl or hybrid)")]
    UnknownPolicy(String),

    #[error("unknown result mode '{0}' (expected requests, scenes or ratio)")]
    UnknownResultMode(String),

    #[error("unknown empty feature policy '{0}' (expected zero, free or resample)")]
    UnknownEmptyFeaturePolicy(String),

    #[error("unknown scale '{0}' (expected regions, states or counties)")]
    UnknownScale(String),

    #[error("invalid {field}: {reason}")]
    InvalidWeights { field: &'static str, reason: String },

    #[error("{field} must be a positive integer")]
    NonPositiveParameter { field: &'static str },

    #[error("weight_step must lie in (0, 1], got {0}")]
    InvalidStep(f64),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Scale(#[from] ConfigError),

    #[error("feature {feature_id} has non-numeric item id '{value}'")]
    InvalidItem { feature_id: u64, value: String },

    #[error("unsupported catalog format for {0} (expected .json or .csv)")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// One Monte Carlo run failed; the whole aggregation is abandoned.
    #[error("run {run} failed: {source}")]
    RunFailed {
        run: usize,
        #[source]
        source: ConfigError,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O: {0}")]
    Io(#[from] io::Error),

    #[error("export CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("export JSON: {0}")]
    Json(#[from] serde_json::Error),
}
