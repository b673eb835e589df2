//! spinbench: contention benchmarks for spin-sync
//!
//! Runs each selected suite with the standard library's primitives and with
//! spin-sync, then prints wall time, CPU time and cycles for both.

use anyhow::{Context, Result};
use clap::Parser;
use spinbench::progress::ProgressTracker;
use spinbench::{run_benchmarks, Args, BenchConfig};
use tracing::{info, Level};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging based on verbosity and quiet mode
    let level = if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Validate arguments
    args.validate().context("Invalid arguments")?;

    let config = BenchConfig::from_args(&args);
    let suites = args.selected_suites();

    info!("Starting spinbench v{}", env!("CARGO_PKG_VERSION"));
    info!("Threads: {}", config.threads);
    info!("Iterations per thread: {}", config.iterations);
    info!("Yields per retry: {}", config.policy.yields_per_retry());
    match config.policy.spin_limit() {
        Some(limit) => info!("Spin limit before parking: {}", limit),
        None => info!("Spin limit before parking: never park"),
    }

    let mut progress = ProgressTracker::new(suites.len(), args.progress && !args.quiet);
    let results = run_benchmarks(&suites, &config, &mut progress).context("Benchmark run failed")?;

    for comparison in &results {
        println!("{comparison}");
    }

    info!("Benchmarks completed successfully");
    Ok(())
}
