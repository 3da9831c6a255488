//! texpack binary entry point.
//!
//! A thin wrapper around the texpack-cache library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Validates configuration
//! 4. Runs the selected operation and prints its report
//!
//! Any error ends the process with exit code 1.

use anyhow::{Context, Result};
use texpack_cache::{Cli, Command, inspect, merge_caches, upgrade_htc};
use texpack_formats::BufferArena;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // RUST_LOG takes precedence over --log-level / TEXPACK_LOG
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cli.log_level)
            .with_context(|| format!("invalid log filter {:?}", cli.log_level))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli.validate()?;

    match &cli.command {
        Command::Merge(args) => {
            let report = merge_caches(&args.first, &args.second, &args.output)
                .with_context(|| format!("merging into {}", args.output.display()))?;
            println!("{}: {}", args.output.display(), report);
        }
        Command::Upgrade(args) => {
            let output = args.output_path()?;
            let mut arena = BufferArena::new();
            let report = upgrade_htc(&args.input, &output, &mut arena)
                .with_context(|| format!("upgrading {}", args.input.display()))?;
            println!("{}: {}", output.display(), report);
        }
        Command::Inspect(args) => {
            let inspection = inspect(&args.cache, args.entries)
                .with_context(|| format!("inspecting {}", args.cache.display()))?;
            println!("{inspection}");
        }
    }

    Ok(())
}
