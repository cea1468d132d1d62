//! Rayon thread pool for Monte Carlo runs.
//!
//! A [WorkerPool] is built once and reused for every sweep point. With zero workers it
//! defers to Rayon's global pool (all CPU cores).

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::warn;

/// Environment variable overriding the configured worker count.
pub const WORKERS_ENV: &str = "HOTLAYER_WORKERS";

#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    pool: Option<Arc<ThreadPool>>,
}

impl WorkerPool {
    /// Use all available CPU cores (Rayon global pool).
    pub fn global() -> Self {
        Self::default()
    }

    /// Dedicated pool with exactly `n` threads; `0` falls back to [WorkerPool::global].
    pub fn with_workers(n: usize) -> Result<Self, ThreadPoolBuildError> {
        if n == 0 {
            return Ok(Self::global());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|index| format!("hotlayer-worker-{index}"))
            .build()?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    /// Number of threads runs are spread over.
    pub fn workers(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Run a closure inside this pool so nested Rayon iterators use its threads.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

/// Worker count from [WORKERS_ENV], falling back to `configured` when unset or unparsable.
pub fn workers_from_env(configured: usize) -> usize {
    parse_workers(std::env::var(WORKERS_ENV).ok().as_deref(), configured)
}

fn parse_workers(raw: Option<&str>, configured: usize) -> usize {
    let Some(raw) = raw else {
        return configured;
    };
    match raw.trim().parse() {
        Ok(workers) => workers,
        Err(err) => {
            warn!(
                variable = WORKERS_ENV,
                value = raw,
                error = %err,
                configured,
                "ignoring unparsable worker count"
            );
            configured
        }
    }
}

#[cfg(test)]
mod tests {
    use rayon::prelude::*;

    use super::*;

    #[test]
    fn dedicated_pool_reports_its_size() {
        let pool = WorkerPool::with_workers(2).expect("pool");
        assert_eq!(pool.workers(), 2);
        let threads = pool.install(rayon::current_num_threads);
        assert_eq!(threads, 2);
    }

    #[test]
    fn pool_is_reusable_across_installs() {
        let pool = WorkerPool::with_workers(3).expect("pool");
        for _ in 0..3 {
            let sum: u64 = pool.install(|| (1..=100u64).into_par_iter().sum());
            assert_eq!(sum, 5050);
        }
    }

    #[test]
    fn zero_workers_uses_global_pool() {
        let pool = WorkerPool::with_workers(0).expect("pool");
        assert_eq!(pool.workers(), rayon::current_num_threads());
    }

    #[test]
    fn worker_override_falls_back_when_unset_or_unparsable() {
        assert_eq!(parse_workers(None, 6), 6);
        assert_eq!(parse_workers(Some("4"), 6), 4);
        assert_eq!(parse_workers(Some(" 3 "), 6), 3);
        assert_eq!(parse_workers(Some("four"), 6), 6);
        assert_eq!(parse_workers(Some("-2"), 6), 6);
    }
}
