//! Compare sequential vs pooled Monte Carlo aggregation.
//!
//! Run with: `cargo bench --bench monte_carlo_parallel`
//! Or quick comparison: `cargo run --bin benchmark_parallel_speedup` (see src/bin)

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hotlayer::cache::{CacheConfig, CachePolicy};
use hotlayer::config::SYNTHETIC_FEATURE_COUNTS;
use hotlayer::data::synthetic_catalog;
use hotlayer::optimizer::monte_carlo::{MonteCarloAggregator, SimulationPlan};
use hotlayer::parallel::WorkerPool;
use hotlayer::simulation::SimulationConfig;

fn bench_monte_carlo_sequential_vs_parallel(c: &mut Criterion) {
    let seed = 42u64;
    let runs = 64;
    let catalog = Arc::new(synthetic_catalog(SYNTHETIC_FEATURE_COUNTS, 886, seed));
    let aggregator = MonteCarloAggregator::new(catalog, WorkerPool::global());
    let plan = SimulationPlan {
        cache: CacheConfig::new(CachePolicy::Lru, 250),
        simulation: SimulationConfig {
            num_requests: 500,
            ..SimulationConfig::default()
        },
    };

    let mut group = c.benchmark_group("monte_carlo");
    group.sample_size(20);
    group.measurement_time(std::time::Duration::from_secs(10));

    group.bench_function("sequential", |b| {
        b.iter(|| black_box(aggregator.run_sequential(&plan, runs, seed)));
    });

    group.bench_function("parallel", |b| {
        b.iter(|| black_box(aggregator.run(&plan, runs, seed)));
    });

    group.finish();
}

criterion_group!(benches, bench_monte_carlo_sequential_vs_parallel);
criterion_main!(benches);
