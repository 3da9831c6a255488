//! Hi-res texture cache tooling.
//!
//! This crate works on whole HTS cache files, built on the record codec in
//! `texpack-formats`:
//! - Merging two caches into one, reusing record space where possible
//! - Upgrading gzip HTC caches to HTS
//! - Inspecting headers and mapping tables
//!
//! # Architecture
//!
//! - `reader`: Open a cache, read its mapping table and records
//! - `writer`: Single-handle output with cursor-restoring detours
//! - `merge`: The merge engine and its report
//! - `upgrade`: HTC to HTS conversion
//! - `inspect`: Header and entry summaries
//! - `config`: Command-line configuration and validation
//!
//! # Example
//!
//! ```no_run
//! use texpack_cache::merge_caches;
//!
//! fn main() -> anyhow::Result<()> {
//!     let report = merge_caches(
//!         "GAME_HIRESTEXTURES.hts",
//!         "GAME_PATCH_HIRESTEXTURES.hts",
//!         "GAME_MERGED_HIRESTEXTURES.hts",
//!     )?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::cast_possible_truncation)] // Record sizes are bounded well below usize::MAX
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod inspect;
pub mod merge;
pub mod reader;
pub mod upgrade;
pub mod writer;

pub use config::{Cli, Command, InspectArgs, MergeArgs, UpgradeArgs};
pub use error::{CacheError, ConfigError, Result};
pub use inspect::{EntrySummary, Inspection, inspect};
pub use merge::{MergeEngine, MergeReport, Placement, check_combination, merge_caches, merge_with_arena};
pub use reader::CacheReader;
pub use upgrade::{UpgradeReport, default_output_path, upgrade_htc};
pub use writer::CacheWriter;
