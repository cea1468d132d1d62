use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::cache::CachePolicy;
use crate::config::{load_run_config, RunConfig};
use crate::error::{CatalogError, ConfigError, ConfigFileError, ExportError, SimulationError};
use crate::optimizer::export::{write_history_json, write_results_csv_file, SweepReport};
use crate::optimizer::ranking::rank_points;
use crate::optimizer::weight_grid::{WeightGrid, DEFAULT_WEIGHT_DECIMALS};
use crate::optimizer::ParameterRange;
use crate::simulation::{
    entropy_seed, simulate_run, EmptyFeaturePolicy, ResultMode, WorkloadWeights,
};

#[derive(Debug, Parser)]
#[command(name = "hotlayer", version, about = "Tiered-cache simulation for hierarchical scene catalogs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// One seeded run; prints the run result as JSON.
    Simulate(SimulateArgs),
    /// Monte Carlo runs of one configuration; prints the statistic as JSON.
    Aggregate(AggregateArgs),
    /// Weights × parameter sweep; prints the sweep report as JSON.
    Sweep(SweepArgs),
    /// Print the weight grid for a step.
    Grid(GridArgs),
}

/// Settings shared by every simulating command. Flags override the YAML file.
#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// YAML run file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// JSON or CSV feature → scenes mapping. Defaults to a synthetic catalog.
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Request-mix weights `regions,states,counties`.
    #[arg(long)]
    pub weights: Option<WorkloadWeights>,
    #[arg(long)]
    pub policy: Option<CachePolicy>,
    /// Capacity (lru, hybrid) or life span (ttl).
    #[arg(long)]
    pub parameter: Option<usize>,
    /// Hybrid life span.
    #[arg(long)]
    pub expiration: Option<u32>,
    #[arg(long)]
    pub prepopulate: bool,
    #[arg(long)]
    pub universe: Option<u64>,
    #[arg(long)]
    pub requests: Option<usize>,
    #[arg(long)]
    pub mode: Option<ResultMode>,
    #[arg(long = "empty-features")]
    pub empty_features: Option<EmptyFeaturePolicy>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Draw the base seed from OS entropy; the chosen seed is logged.
    #[arg(long, conflicts_with = "seed")]
    pub random_seed: bool,
    #[arg(long)]
    pub workers: Option<usize>,
}

impl PlanArgs {
    fn run_config(&self) -> Result<RunConfig, CommandError> {
        let mut config = match &self.config {
            Some(path) => load_run_config(path)?,
            None => RunConfig::default(),
        };
        if let Some(catalog) = &self.catalog {
            config.catalog = Some(catalog.clone());
        }
        if let Some(weights) = self.weights {
            config.simulation.weights = weights;
        }
        if let Some(policy) = self.policy {
            config.cache.policy = policy;
        }
        if let Some(parameter) = self.parameter {
            config.cache.parameter = parameter;
        }
        if let Some(expiration) = self.expiration {
            config.cache.expiration = expiration;
        }
        if self.prepopulate {
            config.cache.prepopulate = true;
        }
        if let Some(universe) = self.universe {
            config.cache.universe_size = universe;
        }
        if let Some(requests) = self.requests {
            config.simulation.num_requests = requests;
        }
        if let Some(mode) = self.mode {
            config.simulation.result_mode = mode;
        }
        if let Some(policy) = self.empty_features {
            config.simulation.empty_feature_policy = policy;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.random_seed {
            config.seed = entropy_seed();
            info!(seed = config.seed, "drew base seed from entropy");
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    /// Include the resident set after every request.
    #[arg(long)]
    pub history: bool,
    /// Write the history frames to this JSON file instead of the result.
    #[arg(long = "history-out")]
    pub history_out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    #[arg(long)]
    pub runs: Option<usize>,
}

#[derive(Debug, Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    #[arg(long)]
    pub runs: Option<usize>,
    /// Weight grid step. Without it, `--weights` pins a single weight triple.
    #[arg(long)]
    pub step: Option<f64>,
    #[arg(long)]
    pub decimals: Option<u32>,
    /// Cache parameters to sweep, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub params: Vec<usize>,
    /// Evenly spaced parameters `start:end:count`.
    #[arg(long = "param-range")]
    pub param_range: Option<ParameterRange>,
    /// Also write the results table here.
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// List report points by mean, best first, instead of grid order.
    #[arg(long)]
    pub ranked: bool,
}

#[derive(Debug, Args)]
pub struct GridArgs {
    #[arg(long)]
    pub step: f64,
    #[arg(long, default_value_t = DEFAULT_WEIGHT_DECIMALS)]
    pub decimals: u32,
}

#[derive(Debug, Error)]
enum CommandError {
    #[error(transparent)]
    ConfigFile(#[from] ConfigFileError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Parse and dispatch. Exit codes: 0 success, 1 command failure, 2 usage error.
pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };

    let (name, outcome) = match cli.command {
        Command::Simulate(args) => ("simulate", handle_simulate(args)),
        Command::Aggregate(args) => ("aggregate", handle_aggregate(args)),
        Command::Sweep(args) => ("sweep", handle_sweep(args)),
        Command::Grid(args) => ("grid", handle_grid(args)),
    };
    match outcome {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{name} failed: {err}");
            1
        }
    }
}

fn handle_simulate(args: SimulateArgs) -> Result<(), CommandError> {
    let mut config = args.plan.run_config()?;
    if args.history || args.history_out.is_some() {
        config.simulation.capture_history = true;
    }
    let catalog = config.load_catalog()?;
    let mut result = simulate_run(&catalog, config.cache, config.simulation, config.seed)?;
    if let Some(path) = &args.history_out {
        let frames = result.history.take().unwrap_or_default();
        let file = File::create(path).map_err(ExportError::from)?;
        write_history_json(BufWriter::new(file), &frames)?;
        info!(path = %path.display(), frames = frames.len(), "history written");
    }
    print_json(&result)
}

fn handle_aggregate(args: AggregateArgs) -> Result<(), CommandError> {
    let mut config = args.plan.run_config()?;
    if let Some(runs) = args.runs {
        config.runs = runs;
    }
    let catalog = Arc::new(config.load_catalog()?);
    let aggregator = config.aggregator(catalog)?;
    let statistic = aggregator.run(&config.plan(), config.runs, config.seed)?;
    print_json(&statistic)
}

fn handle_sweep(args: SweepArgs) -> Result<(), CommandError> {
    let mut config = args.plan.run_config()?;
    if let Some(runs) = args.runs {
        config.runs = runs;
    }
    match args.step {
        Some(step) => config.sweep.weight_step = Some(step),
        None if args.plan.weights.is_some() => config.sweep.weight_step = None,
        None => {}
    }
    if let Some(decimals) = args.decimals {
        config.sweep.weight_decimals = decimals;
    }
    if !args.params.is_empty() {
        config.sweep.parameter_grid = args.params;
    }
    if let Some(range) = args.param_range {
        config.sweep.parameter_range = Some(range);
    }
    config.validate()?;

    let catalog = Arc::new(config.load_catalog()?);
    let driver = config.sweep_driver(catalog)?;
    let mut outcome = driver.run()?;
    if let Some(path) = &args.csv {
        write_results_csv_file(path, &outcome.points)?;
    }
    if args.ranked {
        outcome.points = rank_points(&outcome.points);
    }
    let report = SweepReport::new(config, outcome);
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    report.write_json(&mut handle)?;
    writeln!(handle).map_err(ExportError::from)?;
    Ok(())
}

fn handle_grid(args: GridArgs) -> Result<(), CommandError> {
    let grid = WeightGrid::with_decimals(args.step, args.decimals)?;
    print_json(&grid.points())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CommandError> {
    let payload = serde_json::to_string_pretty(value).map_err(ExportError::from)?;
    println!("{payload}");
    Ok(())
}
