//! Error types for cache-level operations.
//!
//! All errors use thiserror for consistent error handling across the codebase.

use std::path::PathBuf;
use texpack_formats::{FormatError, FormatVersion, RecordError};
use thiserror::Error;

/// Errors raised while reading, writing, merging or upgrading caches.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Open, read, write or seek failure on a cache file
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File the operation was performed on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Header or mapping table of a file is malformed
    #[error("invalid cache file {path}: {source}")]
    Format {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying format error
        #[source]
        source: FormatError,
    },

    /// A single record could not be decoded or converted
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// The two inputs cannot be merged into one output layout
    #[error("cannot merge a {second} cache into a {first} cache")]
    UnsupportedCombination {
        /// Layout of the first input, which the output adopts
        first: FormatVersion,
        /// Layout of the second input
        second: FormatVersion,
    },

    /// An in-place overwrite would run past the existing record
    #[error("record of {len} bytes does not fit the {footprint} bytes at offset {offset}")]
    FootprintExceeded {
        /// Offset of the existing record
        offset: u64,
        /// Bytes the existing record occupies
        footprint: u64,
        /// Bytes that were about to be written
        len: u64,
    },

    /// The output cursor did not return to the append position after a detour
    #[error("output cursor at {actual}, expected append position {expected}")]
    CursorMismatch {
        /// Position before the detour
        expected: u64,
        /// Position after restoring
        actual: u64,
    },

    /// Invalid command-line configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CacheError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a format error with the path it happened on
    ///
    /// I/O errors surfacing through the format layer are reported as I/O.
    pub fn format(path: impl Into<PathBuf>, source: FormatError) -> Self {
        match source {
            FormatError::Io(io) => Self::io(path, io),
            other => Self::Format {
                path: path.into(),
                source: other,
            },
        }
    }

    /// Whether the error concerns a single record and the caller may move on
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Record(_))
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Input file does not exist
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Input file name does not follow the hi-res cache convention
    #[error("file name of {0} does not contain _HIRESTEXTURES.hts (pass --any-name to skip this check)")]
    NamingConvention(PathBuf),

    /// Output path is one of the inputs
    #[error("output {0} would overwrite an input")]
    OutputIsInput(PathBuf),

    /// Upgrade input does not have the `.htc` extension
    #[error("{0} does not end with .htc")]
    NotHtc(PathBuf),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
