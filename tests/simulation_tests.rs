use std::sync::Arc;

use hotlayer::cache::{CacheConfig, CachePolicy};
use hotlayer::data::{catalog_from_json, FeatureCatalog, Scale};
use hotlayer::optimizer::monte_carlo::{MonteCarloAggregator, SimulationPlan};
use hotlayer::parallel::WorkerPool;
use hotlayer::simulation::{
    simulate_run, EmptyFeaturePolicy, ResultMode, SimulationConfig, WorkloadWeights,
};

fn worked_example_catalog() -> FeatureCatalog {
    catalog_from_json(r#"{"regions": {"0": [10, 11]}, "states": {"0": [11, 12]}}"#)
        .expect("valid catalog")
}

fn regions_only(num_requests: usize, result_mode: ResultMode) -> SimulationConfig {
    SimulationConfig {
        num_requests,
        weights: WorkloadWeights::new(1.0, 0.0, 0.0).expect("valid"),
        result_mode,
        ..SimulationConfig::default()
    }
}

#[test]
fn capacity_one_lru_never_serves_a_two_item_feature() {
    let catalog = worked_example_catalog();
    let cache = CacheConfig::new(CachePolicy::Lru, 1);

    let requests = simulate_run(&catalog, cache, regions_only(2, ResultMode::Requests), 5)
        .expect("valid run");
    assert_eq!(requests.value, 0.0);

    let scenes = simulate_run(&catalog, cache, regions_only(2, ResultMode::Scenes), 5)
        .expect("valid run");
    assert_eq!(scenes.value, 1.0);
    assert_eq!(scenes.counters.scenes_requested, 4);
}

#[test]
fn ratio_mode_is_hits_over_requested_scenes() {
    let catalog = worked_example_catalog();
    let result = simulate_run(
        &catalog,
        CacheConfig::new(CachePolicy::Lru, 1),
        regions_only(2, ResultMode::Ratio),
        5,
    )
    .expect("valid run");
    assert_eq!(result.value, 0.25);
}

#[test]
fn all_empty_workload_yields_zero_ratio_without_dividing() {
    let catalog = worked_example_catalog();
    let config = SimulationConfig {
        num_requests: 10,
        weights: WorkloadWeights::only(Scale::County),
        result_mode: ResultMode::Ratio,
        ..SimulationConfig::default()
    };
    let result = simulate_run(&catalog, CacheConfig::default(), config, 1).expect("valid run");
    assert_eq!(result.value, 0.0);
    assert_eq!(result.counters.empty_requests, 10);
    assert_eq!(result.counters.scenes_requested, 0);
}

#[test]
fn empty_feature_policies_differ_only_in_accounting() {
    let catalog = worked_example_catalog();
    let base = SimulationConfig {
        num_requests: 8,
        weights: WorkloadWeights::only(Scale::County),
        result_mode: ResultMode::Requests,
        ..SimulationConfig::default()
    };

    let zero = simulate_run(&catalog, CacheConfig::default(), base, 2).expect("valid run");
    assert_eq!(zero.value, 0.0);

    let free = SimulationConfig {
        empty_feature_policy: EmptyFeaturePolicy::CountAsFree,
        ..base
    };
    let free = simulate_run(&catalog, CacheConfig::default(), free, 2).expect("valid run");
    assert_eq!(free.value, 8.0);

    // Nothing to resample into: the retry limit still terminates every request.
    let resample = SimulationConfig {
        empty_feature_policy: EmptyFeaturePolicy::Resample,
        ..base
    };
    let resample = simulate_run(&catalog, CacheConfig::default(), resample, 2).expect("valid run");
    assert_eq!(resample.counters.requests, 8);
    assert_eq!(resample.counters.empty_requests, 8);
}

#[test]
fn resample_skips_empty_scales_when_others_have_data() {
    let catalog = worked_example_catalog();
    let config = SimulationConfig {
        num_requests: 50,
        weights: WorkloadWeights::new(0.1, 0.1, 0.8).expect("valid"),
        empty_feature_policy: EmptyFeaturePolicy::Resample,
        ..SimulationConfig::default()
    };
    let result = simulate_run(&catalog, CacheConfig::default(), config, 4).expect("valid run");
    assert_eq!(result.counters.empty_requests, 0);
    assert_eq!(result.counters.requests, 50);
}

#[test]
fn same_seed_same_result() {
    let catalog = worked_example_catalog();
    let config = SimulationConfig {
        num_requests: 40,
        weights: WorkloadWeights::new(0.5, 0.5, 0.0).expect("valid"),
        capture_history: true,
        ..SimulationConfig::default()
    };
    let cache = CacheConfig::new(CachePolicy::Ttl, 3);
    let first = simulate_run(&catalog, cache, config, 77).expect("valid run");
    let second = simulate_run(&catalog, cache, config, 77).expect("valid run");
    assert_eq!(first, second);
    assert_eq!(first.history.map(|h| h.len()), Some(40));
}

#[test]
fn aggregation_is_independent_of_worker_count() {
    let catalog = Arc::new(worked_example_catalog());
    let plan = SimulationPlan {
        cache: CacheConfig::new(CachePolicy::Hybrid, 2),
        simulation: SimulationConfig {
            num_requests: 30,
            weights: WorkloadWeights::new(0.5, 0.5, 0.0).expect("valid"),
            result_mode: ResultMode::Scenes,
            ..SimulationConfig::default()
        },
    };
    let single = MonteCarloAggregator::new(catalog.clone(), WorkerPool::with_workers(1).expect("pool"))
        .run(&plan, 40, 123)
        .expect("aggregate");
    let many = MonteCarloAggregator::new(catalog, WorkerPool::with_workers(4).expect("pool"))
        .run(&plan, 40, 123)
        .expect("aggregate");
    assert_eq!(single, many);
    assert_eq!(single.runs, 40);
    assert!(single.std_err <= single.std_dev);
}
