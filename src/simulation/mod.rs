pub mod engine;
pub mod rng;
pub mod sampler;
pub mod weights;

pub use engine::{
    simulate_run, EmptyFeaturePolicy, ResultMode, RunCounters, RunResult, SimulationConfig,
    SingleRunSimulator, DEFAULT_NUM_REQUESTS, MAX_RESAMPLE_ATTEMPTS,
};
pub use rng::{derive_seed, entropy_seed, SimRng};
pub use sampler::{Request, WorkloadSampler};
pub use weights::{WorkloadWeights, WEIGHT_SUM_TOLERANCE};
