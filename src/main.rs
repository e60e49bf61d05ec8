//! Measurement binary for the `lazyslot` crate.
//!
//! Allocates the 1 GiB slot cache, spawns the worker pool, and prints the
//! aggregate checksum and throughput. Thread count and total iterations are
//! optional positional arguments; a value that does not parse falls back to
//! its default with a warning instead of failing the run.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lazyslot::bench::{self, BenchOptions, IndexOrder};
use lazyslot::cache::{CacheConfig, ConfigError, DEFAULT_CACHE_BYTES};

const DEFAULT_THREADS: usize = 64;
const DEFAULT_ITERATIONS: usize = 100_000_000;

/// Lazy-initialization slot cache benchmark.
#[derive(Parser, Debug)]
#[command(name = "lazyslot", version, about)]
struct Args {
    /// Worker thread count (default 64).
    threads: Option<String>,

    /// Total iterations across all threads (default 100000000).
    iterations: Option<String>,

    /// Seed for a reproducible index sequence; omitted means OS entropy.
    #[arg(long)]
    seed: Option<u64>,
}

/// Parses an optional positional, falling back to the default on anything
/// malformed. Bad input is a recoverable configuration slip, not a failure.
fn parse_or_default(arg: Option<&str>, name: &str, default: usize) -> usize {
    match arg {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(%raw, default, "malformed {name}, using default");
                default
            }
        },
    }
}

fn main() -> Result<(), ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let threads = parse_or_default(args.threads.as_deref(), "thread count", DEFAULT_THREADS);
    let iterations = parse_or_default(
        args.iterations.as_deref(),
        "iteration count",
        DEFAULT_ITERATIONS,
    );

    let config = CacheConfig::with_byte_budget(DEFAULT_CACHE_BYTES)?;
    let cache = config.build();

    let opts = BenchOptions {
        threads,
        total_iterations: iterations,
        order: match args.seed {
            Some(seed) => IndexOrder::Seeded(seed),
            None => IndexOrder::Entropy,
        },
    };

    println!("Cache size: {}", cache.byte_size());
    println!("Cache items: {}", cache.len());
    println!("Threads: {}", opts.threads);
    println!();
    println!("Iterations : {}", opts.total_iterations);
    println!(
        "Iterations / thread : {}",
        opts.total_iterations / opts.threads.max(1)
    );

    let report = bench::run(&cache, &opts);

    println!("SUM: {}", report.checksum);
    println!("ACCESS RATE: {:.3} M/s", report.ops_per_sec() / 1e6);
    println!("BANDWIDTH: {:.3} GB/s", report.bytes_per_sec() / 1e9);

    Ok(())
}
