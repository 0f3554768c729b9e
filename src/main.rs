use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use firefly_mimo::detector::FireflyParams;
use firefly_mimo::error::SimResult;
use firefly_mimo::problem::Problem;
use firefly_mimo::sim::{ReceiverSpec, Silent, SweepConfig, SweepObserver, run_sweep};
use firefly_mimo::ui::{ProgressManager, print_banner};
use firefly_mimo::utils::consts::*;
use firefly_mimo::utils::logging::init_logging;

#[derive(Parser)]
#[command(author, version, about = "Firefly MIMO detection and BER simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect one problem read from JSON (`-` for stdin)
    Detect {
        #[arg(short, long, default_value = "-")]
        input: String,
        #[arg(short, long, default_value_t = DEFAULT_FIREFLY_ITERATIONS)]
        nb_iter: usize,
        #[arg(short, long, default_value_t = DEFAULT_FIREFLY_GAMMA)]
        gamma: f64,
        #[arg(short, default_value_t = DEFAULT_FIREFLY_K)]
        k: f64,
        #[arg(short, long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
    /// BER versus SNR for K-best and firefly receivers
    Sweep {
        /// JSON sweep configuration; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Report destination, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        seed: Option<u64>,
        /// SNR points in dB
        #[arg(long, num_args = 1..)]
        snr: Option<Vec<f64>>,
        #[arg(long)]
        target_errors: Option<u64>,
        #[arg(long)]
        max_chunks: Option<u64>,
        #[arg(long)]
        chunk_bits: Option<usize>,
        /// Firefly pool sizes to compare, replaces the configured firefly receivers
        #[arg(long, num_args = 1..)]
        iterations: Option<Vec<usize>>,
        #[arg(long)]
        no_progress: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Detect {
            input,
            nb_iter,
            gamma,
            k,
            seed,
        } => detect(&input, FireflyParams { nb_iter, gamma, k }, seed),
        Commands::Sweep {
            config,
            output,
            seed,
            snr,
            target_errors,
            max_chunks,
            chunk_bits,
            iterations,
            no_progress,
        } => {
            print_banner();
            load_config(config).and_then(|mut cfg| {
                if let Some(seed) = seed {
                    cfg.seed = seed;
                }
                if let Some(snr) = snr {
                    cfg.snr_db = snr;
                }
                if let Some(n) = target_errors {
                    cfg.target_errors = n;
                }
                if let Some(n) = max_chunks {
                    cfg.max_chunks = n;
                }
                if let Some(n) = chunk_bits {
                    cfg.chunk_bits = n;
                }
                if let Some(pools) = iterations {
                    cfg.receivers.retain(|r| !matches!(r, ReceiverSpec::Firefly(_)));
                    cfg.receivers.extend(
                        pools
                            .into_iter()
                            .map(|n| ReceiverSpec::Firefly(FireflyParams::with_iterations(n))),
                    );
                }
                sweep(&cfg, output, !no_progress)
            })
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> SimResult<SweepConfig> {
    match path {
        Some(path) => SweepConfig::load(path),
        None => Ok(SweepConfig::default()),
    }
}

fn detect(input: &str, params: FireflyParams, seed: u64) -> SimResult<()> {
    let problem = match input {
        "-" => Problem::from_reader(io::stdin().lock())?,
        path => Problem::from_reader(BufReader::new(File::open(path)?))?,
    };
    tracing::debug!(
        "Detecting {} problem with {} candidates",
        if problem.is_complex() { "complex" } else { "real" },
        params.nb_iter
    );
    let solution = problem.solve(params, seed)?;
    println!("{}", serde_json::to_string_pretty(&solution)?);
    Ok(())
}

fn sweep(config: &SweepConfig, output: Option<PathBuf>, progress: bool) -> SimResult<()> {
    config.validate()?;
    tracing::info!(
        "{}x{} {:?}, {} SNR points, {} receivers, seed {}",
        config.nb_tx,
        config.nb_rx,
        config.modem,
        config.snr_db.len(),
        config.receivers.len(),
        config.seed
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let c = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        c.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!("Ctrl-C handler unavailable: {}", e);
    }

    let progress_manager = ProgressManager::new();
    let observer: &dyn SweepObserver = if progress { &progress_manager } else { &Silent };
    let report = run_sweep(config, &cancel, observer)?;
    progress_manager.finish_all();

    if report.interrupted {
        tracing::warn!("Sweep interrupted, writing partial results");
    }
    eprint!("{}", report.table());
    report.write_json(output.as_deref())?;
    Ok(())
}
