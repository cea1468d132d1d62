//! Single-run throughput per cache policy, optionally appended to a log for trend tracking.
//!
//! Usage:
//!   cargo run --release --bin benchmark_simulator
//!   cargo run --release --bin benchmark_simulator -- --log
//!
//! --log  Append one row per policy to benchmark_log.csv (date, policy, runs_per_sec, requests_per_sec, requests_per_run).

use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::time::Instant;

use hotlayer::cache::{CacheConfig, CachePolicy};
use hotlayer::config::SYNTHETIC_FEATURE_COUNTS;
use hotlayer::data::synthetic_catalog;
use hotlayer::simulation::{SimRng, SimulationConfig, SingleRunSimulator};

// Run each policy for at least this long or this many runs
const MIN_DURATION_MS: u128 = 2000;
const MIN_RUNS: u32 = 200;

fn main() -> Result<(), Box<dyn Error>> {
    let log = std::env::args().any(|a| a == "--log");

    let catalog = synthetic_catalog(SYNTHETIC_FEATURE_COUNTS, 886, 7);
    let requests_per_run = 1000usize;
    let config = SimulationConfig {
        num_requests: requests_per_run,
        ..SimulationConfig::default()
    };

    let mut rows = Vec::new();
    for policy in [CachePolicy::Lru, CachePolicy::Ttl, CachePolicy::Hybrid] {
        let parameter = if policy == CachePolicy::Ttl { 20 } else { 250 };
        let simulator = SingleRunSimulator::new(&catalog, CacheConfig::new(policy, parameter), config)?;
        let mut rng = SimRng::new(7);

        let start = Instant::now();
        let mut runs: u32 = 0;
        while start.elapsed().as_millis() < MIN_DURATION_MS || runs < MIN_RUNS {
            let _ = simulator.run(&mut rng)?;
            runs += 1;
        }
        let elapsed_secs = start.elapsed().as_secs_f64();
        let runs_per_sec = runs as f64 / elapsed_secs;
        let requests_per_sec = runs_per_sec * requests_per_run as f64;

        println!("Simulator benchmark ({policy}, {requests_per_run} requests/run):");
        println!("  Runs:        {}", runs);
        println!("  Duration:    {:.2} s", elapsed_secs);
        println!("  Runs/s:      {:.2}", runs_per_sec);
        println!("  Requests/s:  {:.2}", requests_per_sec);
        rows.push((policy, runs_per_sec, requests_per_sec));
    }

    if log {
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let path = "benchmark_log.csv";
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata().map(|m| m.len() == 0).unwrap_or(true) {
            file.write_all(b"date,policy,runs_per_sec,requests_per_sec,requests_per_run\n")?;
        }
        for (policy, runs_per_sec, requests_per_sec) in rows {
            let line = format!("{date},{policy},{runs_per_sec:.4},{requests_per_sec:.4},{requests_per_run}\n");
            file.write_all(line.as_bytes())?;
        }
        file.flush()?;
        println!("Appended to {}", path);
    }
    Ok(())
}
