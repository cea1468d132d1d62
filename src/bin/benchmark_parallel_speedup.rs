//! Aggregate the same plan sequentially and on the worker pool, then print timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_parallel_speedup

use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

use hotlayer::cache::{CacheConfig, CachePolicy};
use hotlayer::config::{default_runs, SYNTHETIC_FEATURE_COUNTS};
use hotlayer::data::synthetic_catalog;
use hotlayer::optimizer::monte_carlo::{MonteCarloAggregator, SimulationPlan};
use hotlayer::parallel::{workers_from_env, WorkerPool};
use hotlayer::simulation::SimulationConfig;

fn main() -> Result<(), Box<dyn Error>> {
    let seed = 12345u64;
    let runs = (default_runs() * 16).max(64);
    let catalog = Arc::new(synthetic_catalog(SYNTHETIC_FEATURE_COUNTS, 886, seed));
    let pool = WorkerPool::with_workers(workers_from_env(0))?;
    let aggregator = MonteCarloAggregator::new(catalog, pool);
    let plan = SimulationPlan {
        cache: CacheConfig::new(CachePolicy::Hybrid, 250),
        simulation: SimulationConfig {
            num_requests: 1000,
            ..SimulationConfig::default()
        },
    };

    println!(
        "Monte Carlo: {} runs × {} requests ({} policy, {} workers)",
        runs,
        plan.simulation.num_requests,
        plan.cache.policy,
        aggregator.pool().workers()
    );
    println!();

    let t0 = Instant::now();
    let sequential = aggregator.run_sequential(&plan, runs, seed)?;
    let elapsed_seq = t0.elapsed();
    let seq_ms = elapsed_seq.as_secs_f64() * 1000.0;
    println!("Sequential:  {:.2} ms  ({:.1} runs/s)", seq_ms, runs as f64 / elapsed_seq.as_secs_f64());

    let t0 = Instant::now();
    let parallel = aggregator.run(&plan, runs, seed)?;
    let elapsed_par = t0.elapsed();
    let par_ms = elapsed_par.as_secs_f64() * 1000.0;
    println!("Parallel:    {:.2} ms  ({:.1} runs/s)", par_ms, runs as f64 / elapsed_par.as_secs_f64());

    println!();
    println!("Speedup:     {:.2}x faster (parallel vs sequential)", seq_ms / par_ms);

    assert_eq!(sequential, parallel, "sequential and parallel statistics differ");
    println!("(Statistics match: mean {:.4}, std_dev {:.4})", parallel.mean, parallel.std_dev);
    Ok(())
}
