//! skyburst-sim CLI
//!
//! Simulate a population of GRBs against the detector responses and
//! bundle the results into one survey file.

use clap::Parser;
use skyburst_core::{RegistryConfig, ResponseRegistry};
use skyburst_sim::{Executor, GbmInstrument, RayonExecutor, Universe};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Simulate a GRB population for a GBM-like instrument.
#[derive(Parser, Debug)]
#[command(name = "skyburst-sim")]
#[command(about = "Run a GRB population through the detector responses", long_about = None)]
struct Args {
    /// Pre-filtered population file (JSON)
    population: PathBuf,

    /// Base name for the per-GRB store files
    #[arg(short, long, default_value = "SynthGRB")]
    base_name: String,

    /// Directory the store files are written to
    #[arg(short, long, default_value = ".")]
    save_path: PathBuf,

    /// Write the aggregate survey to this file after the run
    #[arg(long)]
    survey: Option<PathBuf>,

    /// Run the batch on a thread pool instead of sequentially
    #[arg(short, long)]
    parallel: bool,

    /// Worker count for --parallel (default: one per core)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Master seed for photon sampling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Directory of per-detector calibration files ({code}.json)
    #[arg(long)]
    calibration_dir: Option<PathBuf>,

    /// Spacecraft pointing-history file
    #[arg(long)]
    pointing_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ResponseRegistry::obtain(&RegistryConfig {
        calibration_dir: args.calibration_dir.clone(),
        pointing_file: args.pointing_file.clone(),
    })?;

    let instrument = GbmInstrument::new(registry, args.seed);

    let mut universe = Universe::new(
        instrument,
        &args.population,
        &args.base_name,
        &args.save_path,
    )?;

    info!(
        "{} of {} GRBs queued (the rest already have stores)",
        universe.queued(),
        universe.n_grbs()
    );

    let executor = args.parallel.then(|| match args.threads {
        Some(n) => RayonExecutor::new().with_threads(n),
        None => RayonExecutor::new(),
    });

    universe.go(executor.as_ref().map(|e| e as &dyn Executor))?;

    if let Some(survey) = &args.survey {
        universe.save(survey)?;
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
