pub mod pool;

pub use pool::{workers_from_env, WorkerPool, WORKERS_ENV};
