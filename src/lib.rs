//! Tiered-cache simulation: weighted hierarchical workloads against LRU, TTL and hybrid
//! hot layers, aggregated over parallel Monte Carlo runs and swept over request mixes.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod optimizer;
pub mod parallel;
pub mod simulation;
