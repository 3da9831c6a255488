//! Command-line configuration.
//!
//! Arguments are parsed with clap; options that make sense to set once per
//! environment can also come from variables:
//!
//! - `TEXPACK_LOG`: log filter used when `RUST_LOG` is unset (default `info`)
//! - `TEXPACK_ANY_NAME`: accept merge inputs without the
//!   `_HIRESTEXTURES.hts` suffix
//!
//! # Example
//!
//! ```no_run
//! use texpack_cache::Cli;
//!
//! let cli = Cli::from_args();
//! cli.validate().expect("Invalid configuration");
//! ```

use crate::error::ConfigError;
use crate::upgrade::default_output_path;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use texpack_formats::naming::HIRES_CACHE_SUFFIX;

/// Command-line interface of the `texpack` tool.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "texpack",
    about = "Merge, upgrade and inspect hi-res texture cache (HTS) files",
    version
)]
pub struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. "info", "texpack_cache=debug")
    #[arg(long, global = true, env = "TEXPACK_LOG", default_value = "info")]
    pub log_level: String,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Operations of the `texpack` tool.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Merge two caches; entries of the second win on collision
    Merge(MergeArgs),
    /// Convert a gzip HTC cache into an uncompressed HTS cache
    Upgrade(UpgradeArgs),
    /// Print the header and mapping summary of a cache
    Inspect(InspectArgs),
}

/// Arguments of `texpack merge`.
#[derive(Debug, Clone, Args)]
pub struct MergeArgs {
    /// First input; decides output layout and compression
    pub first: PathBuf,

    /// Second input
    pub second: PathBuf,

    /// Output path (created or truncated)
    pub output: PathBuf,

    /// Accept inputs whose name lacks `_HIRESTEXTURES.hts`
    #[arg(long, env = "TEXPACK_ANY_NAME")]
    pub any_name: bool,
}

/// Arguments of `texpack upgrade`.
#[derive(Debug, Clone, Args)]
pub struct UpgradeArgs {
    /// HTC cache to convert
    pub input: PathBuf,

    /// Output path (default: input with `.htc` replaced by `.hts`)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Arguments of `texpack inspect`.
#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// Cache to inspect
    pub cache: PathBuf,

    /// Also list every mapping entry with its record header
    #[arg(long)]
    pub entries: bool,
}

impl Cli {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Validate the selected command's arguments.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - An input file doesn't exist
    /// - A merge input doesn't follow the cache naming convention
    /// - The output would overwrite an input
    /// - An upgrade input isn't an `.htc` file
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.command {
            Command::Merge(args) => args.validate(),
            Command::Upgrade(args) => args.validate(),
            Command::Inspect(args) => require_file(&args.cache),
        }
    }
}

impl MergeArgs {
    /// Validate inputs and output.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for input in [&self.first, &self.second] {
            require_file(input)?;
            if !self.any_name && !follows_naming(input) {
                return Err(ConfigError::NamingConvention(input.clone()));
            }
        }
        ensure_distinct(&self.output, &[self.first.as_path(), self.second.as_path()])
    }
}

impl UpgradeArgs {
    /// Output path, explicit or derived from the input
    pub fn output_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.output {
            Some(path) => Ok(path.clone()),
            None => default_output_path(&self.input),
        }
    }

    /// Validate input and output.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_file(&self.input)?;
        let output = self.output_path()?;
        ensure_distinct(&output, &[self.input.as_path()])
    }
}

fn require_file(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::MissingInput(path.to_path_buf()))
    }
}

fn follows_naming(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains(HIRES_CACHE_SUFFIX))
}

/// Refuse an output path that resolves to one of the inputs
pub(crate) fn ensure_distinct(output: &Path, inputs: &[&Path]) -> Result<(), ConfigError> {
    let resolved = std::fs::canonicalize(output).unwrap_or_else(|_| output.to_path_buf());
    for input in inputs {
        let input = std::fs::canonicalize(input).unwrap_or_else(|_| input.to_path_buf());
        if input == resolved {
            return Err(ConfigError::OutputIsInput(output.to_path_buf()));
        }
    }
    Ok(())
}
