//! Road Tour Solver - Command Line Interface
//!
//! Finds a short closed tour over every node of a road network.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use road_tour_solver::engine::TourEngine;
use road_tour_solver::heuristics::{ExecutionMode, SearchConfig};
use road_tour_solver::instance::RoadNetwork;
use road_tour_solver::report;
use road_tour_solver::Result;

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "road-tour")]
#[command(version = "1.0")]
#[command(about = "Multi-start nearest neighbor + 2-opt tour solver for road networks")]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for the shortest closed tour
    Solve {
        /// Network JSON file (defaults to the bundled Bangladesh network)
        #[arg(short, long)]
        network: Option<PathBuf>,

        /// Number of random restarts
        #[arg(short, long, default_value = "100")]
        restarts: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Node the tour starts and ends at (defaults to the network origin)
        #[arg(long)]
        origin: Option<String>,

        /// Run trials in parallel
        #[arg(long)]
        parallel: bool,

        /// Worker threads for --parallel (0 = one per core)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Overall time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Write the result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the tour legs as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print network statistics
    Analyze {
        /// Network JSON file (defaults to the bundled Bangladesh network)
        #[arg(short, long)]
        network: Option<PathBuf>,
    },

    /// Resolve the distance between two nodes
    Distance {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Network JSON file (defaults to the bundled Bangladesh network)
        #[arg(short, long)]
        network: Option<PathBuf>,
    },
}

struct SolveOptions {
    network: Option<PathBuf>,
    restarts: usize,
    seed: u64,
    origin: Option<String>,
    parallel: bool,
    threads: usize,
    time_limit: Option<f64>,
    output: Option<PathBuf>,
    csv: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let outcome = match cli.command {
        Commands::Solve { network, restarts, seed, origin, parallel, threads, time_limit, output, csv } => {
            solve(SolveOptions { network, restarts, seed, origin, parallel, threads, time_limit, output, csv })
        }
        Commands::Analyze { network } => analyze(network.as_deref()),
        Commands::Distance { from, to, network } => distance(network.as_deref(), &from, &to),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_network(path: Option<&Path>) -> Result<RoadNetwork> {
    match path {
        Some(path) => RoadNetwork::from_file(path),
        None => RoadNetwork::bangladesh(),
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} trials") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn solve(options: SolveOptions) -> Result<()> {
    let mut network = load_network(options.network.as_deref())?;
    if let Some(origin) = &options.origin {
        network.set_origin(origin)?;
    }

    let config = SearchConfig {
        restarts: options.restarts,
        seed: options.seed,
        mode: if options.parallel {
            ExecutionMode::Parallel { threads: options.threads }
        } else {
            ExecutionMode::Sequential
        },
        time_limit: options.time_limit,
    };

    println!("=== Road Tour Solver ===");
    println!("Network: {}", network.name);
    println!("Total nodes: {}", network.len());
    println!("Starting from: {}", network.name(network.origin()));
    println!("Seed: {}", config.seed);
    println!("\nRunning optimization...\n");

    let mut engine = TourEngine::with_config(network, config)?;

    let pb = progress_bar(options.restarts);
    let start = Instant::now();
    let result = engine.search_with_progress(options.restarts, &|_| pb.inc(1));
    let elapsed = start.elapsed();
    pb.finish_and_clear();

    println!("Completed {} trials in {} ms", result.trials, elapsed.as_millis());
    if let Some(stats) = &result.statistics {
        println!(
            "Trial distances: mean {:.1} km, std {:.1}, best {:.1}, worst {:.1}",
            stats.mean, stats.std_dev, stats.min, stats.max
        );
    }
    println!();
    print!("{}", report::leg_table(engine.resolver(), &result));

    if let Some(path) = &options.output {
        report::export_json(path, engine.resolver(), &result)?;
        println!("\nResult saved to {:?}", path);
    }
    if let Some(path) = &options.csv {
        report::export_legs_csv(path, engine.resolver(), &result)?;
        println!("Legs saved to {:?}", path);
    }

    Ok(())
}

fn analyze(path: Option<&Path>) -> Result<()> {
    let network = load_network(path)?;
    print!("{}", network.statistics());
    Ok(())
}

fn distance(path: Option<&Path>, from: &str, to: &str) -> Result<()> {
    let network = load_network(path)?;
    let a = network
        .node_id(from)
        .ok_or_else(|| road_tour_solver::Error::UnknownNode(from.to_string()))?;
    let b = network
        .node_id(to)
        .ok_or_else(|| road_tour_solver::Error::UnknownNode(to.to_string()))?;

    let engine = TourEngine::new(network, 0);
    let source = engine.resolver().distance_source(a, b);
    println!("{} -> {}: {:.1} km ({:?})", from, to, engine.distance(a, b), source);
    Ok(())
}
