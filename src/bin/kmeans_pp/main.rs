//! Command-line front end: clusters the rows of one CSV file, or of two CSV files joined on
//! their first (key) column, and prints the seeds and the resulting centroids.

mod input;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use kmeans_pp::{Init, KMeans, KMeansConfig, KMeansState};

const CLUSTER_MSG: &str = "Invalid number of clusters!";
const ITER_MSG: &str = "Invalid maximum iteration!";
const EPS_MSG: &str = "Invalid epsilon!";
const ERR_MSG: &str = "An Error Has Occurred";

/// Centroid seeding method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Seeding {
    /// First k rows (after sorting by key).
    Naive,
    /// K-Means++ weighted sampling.
    #[value(name = "kmeans++", alias = "kmeans-pp")]
    KMeansPlusPlus,
}

#[derive(Parser, Debug)]
#[command(name = "kmeans-pp", about = "Lloyd's k-means over keyed CSV input")]
struct Args {
    /// Number of clusters (1 < k < number of rows)
    #[arg(allow_negative_numbers = true)]
    k: String,

    /// Convergence tolerance (>= 0)
    #[arg(allow_negative_numbers = true)]
    epsilon: String,

    /// One or two headerless CSV files; column 0 is the key
    #[arg(required = true, num_args = 1..=2)]
    inputs: Vec<PathBuf>,

    /// Maximum number of iterations (2..=999)
    #[arg(short, long, default_value = "300", allow_negative_numbers = true)]
    iter: String,

    /// Centroid seeding method
    #[arg(long, value_enum, default_value_t = Seeding::KMeansPlusPlus)]
    init: Seeding,

    /// Seed of the k-means++ random source
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log every iteration to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Failures that are reported with their own message instead of the generic one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
enum CliError {
    #[error("{}", CLUSTER_MSG)]
    ClusterCount,
    #[error("{}", ITER_MSG)]
    IterationLimit,
    #[error("{}", EPS_MSG)]
    Epsilon,
}

fn parse_k(s: &str) -> std::result::Result<usize, CliError> {
    s.parse().map_err(|_| CliError::ClusterCount)
}

fn parse_iter(s: &str) -> std::result::Result<usize, CliError> {
    s.parse::<usize>().ok()
        .filter(|i| (2..1000).contains(i))
        .ok_or(CliError::IterationLimit)
}

fn parse_epsilon(s: &str) -> std::result::Result<f64, CliError> {
    s.parse::<f64>().ok()
        .filter(|e| e.is_finite() && *e >= 0.0)
        .ok_or(CliError::Epsilon)
}

/// Keys of the seed rows (k-means++ only), then one line per centroid with 4 decimals.
fn format_result(result: &KMeansState<f64>, keys: &[f64], init: Seeding) -> String {
    let mut out = String::new();
    if let (Seeding::KMeansPlusPlus, Some(chosen)) = (init, &result.chosen_indices) {
        let chosen_keys: Vec<String> = chosen.iter().map(|&i| format!("{}", keys[i] as i64)).collect();
        out.push_str(&chosen_keys.join(","));
        out.push('\n');
    }
    for centroid in result.centroids_iter() {
        let coords: Vec<String> = centroid.iter().map(|c| format!("{:.4}", c)).collect();
        out.push_str(&coords.join(","));
        out.push('\n');
    }
    out
}

fn run(args: &Args) -> Result<String> {
    let k = parse_k(&args.k)?;
    let max_iter = parse_iter(&args.iter)?;
    let epsilon = parse_epsilon(&args.epsilon)?;

    let table = input::load(args.inputs.as_slice()).context("loading input")?;
    if k < 2 || k >= table.rows {
        return Err(CliError::ClusterCount.into());
    }
    tracing::debug!(rows = table.rows, dims = table.dims, k, "input loaded");

    let kmean = KMeans::new(table.values, table.rows, table.dims)?;
    let conf = KMeansConfig::build()
        .random_seed(args.seed)
        .epsilon(epsilon)
        .build();
    let init = match args.init {
        Seeding::Naive => Init::Naive,
        Seeding::KMeansPlusPlus => Init::KMeansPlusPlus,
    };
    let result = kmean.kmeans_lloyd(k, max_iter, init, &conf)?;
    Ok(format_result(&result, &table.keys, args.init))
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => e.exit(), // --help, --version
        Err(_) => {
            println!("{}", ERR_MSG);
            return ExitCode::FAILURE;
        }
    };

    let log_level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match run(&args) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            match e.downcast_ref::<CliError>() {
                Some(cli_error) => println!("{}", cli_error),
                None => println!("{}", ERR_MSG),
            }
            ExitCode::FAILURE
        }
    }
}
