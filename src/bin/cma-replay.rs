//! CMA pool log replayer
//!
//! The `cma-replay` binary reads a kernel log containing `@@@` buffer-object
//! events and replays it against a simulated CMA pool. Diagnostics go to
//! stderr, one per offending line.
//!
//! # Usage
//!
//! ```bash
//! # Replay a captured dmesg
//! cma-replay dmesg.txt
//!
//! # Read from stdin with a smaller pool and show the counters
//! dmesg | cma-replay --pool-size 67108864 --stats
//!
//! # Trace every purge and eviction decision
//! cma-replay --log-level debug dmesg.txt
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cmapool::{PoolConfig, Replayer, CMA_POOL_SIZE, PAGE_SIZE};

/// CMA pool log replayer
#[derive(Parser, Debug)]
#[command(
    name = "cma-replay",
    version,
    about = "Replay a VC4 buffer-object log against a simulated CMA pool",
    long_about = "Replays the `@@@` buffer-object events of a kernel log against a \
                  bounded pool.\n\n\
                  Problems with individual lines are reported on stderr and the \
                  replay carries on."
)]
struct Args {
    /// Log file to replay (stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Pool size in bytes
    #[arg(long, default_value_t = CMA_POOL_SIZE, env = "CMA_POOL_SIZE")]
    pool_size: u64,

    /// Extent alignment in bytes (0 or 1 for none)
    #[arg(long, default_value_t = PAGE_SIZE, env = "CMA_ALIGNMENT")]
    alignment: u64,

    /// Slide idle buffers down against the buffer below when their use count drops
    #[arg(long)]
    compact: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", env = "CMA_LOG_LEVEL")]
    log_level: String,

    /// Print pool statistics when done
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = PoolConfig::new(args.pool_size)
        .with_alignment(args.alignment)
        .with_compact(args.compact);
    debug!(?config, "pool configuration");

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let mut replayer = Replayer::new(config).context("invalid pool configuration")?;
    replayer.replay(reader).context("replay aborted")?;

    if args.stats {
        println!("{}", replayer.pool().stats().snapshot());
    }

    let report = replayer.finish().context("pool teardown failed")?;
    info!(
        lines = report.lines,
        commands = report.commands,
        diagnostics = report.diagnostics.len(),
        "done"
    );

    Ok(())
}

fn init_logging(args: &Args) {
    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("cmapool={0},cma_replay={0}", args.log_level)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
