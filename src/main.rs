use std::path::PathBuf;

use anyhow::Context;
use cache_sim::trace::TraceReader;
use cache_sim::{Cache, Geometry};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(about = "Replay a load/store trace against a set-associative cache")]
struct Args {
    /// Number of set index bits (2^s sets)
    #[arg(short = 's', value_name = "s")]
    set_bits: u32,

    /// Number of block offset bits (2^b byte blocks)
    #[arg(short = 'b', value_name = "b")]
    block_bits: u32,

    /// Associativity (lines per set)
    #[arg(short = 'E', value_name = "E")]
    associativity: usize,

    /// Trace file to replay
    #[arg(short = 't', value_name = "trace")]
    trace: PathBuf,

    /// Log the outcome of every access
    #[arg(short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info,cache_sim=debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let geometry = Geometry::new(args.set_bits, args.block_bits, args.associativity)
        .context("invalid cache geometry")?;
    tracing::info!(%geometry, trace = %args.trace.display(), "starting simulation");

    let reader = TraceReader::open(&args.trace)
        .with_context(|| format!("error opening {}", args.trace.display()))?;

    let mut cache = Cache::new(geometry);
    for record in reader {
        let record = record.with_context(|| format!("error reading {}", args.trace.display()))?;
        cache.access(&record);
    }

    let stats = cache.stats();
    tracing::info!(
        accesses = stats.accesses(),
        hit_rate = stats.hit_rate(),
        miss_rate = stats.miss_rate(),
        "simulation finished"
    );
    println!("{}", stats);
    Ok(())
}
