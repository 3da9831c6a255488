//! Error types for HTS cache parsing and record coding

use thiserror::Error;

/// Errors raised while reading the file-level structures of a cache
/// (header, mapping table, packed offsets).
///
/// These are fatal for the file being read.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Header marker is neither of the two known values
    #[error("invalid header marker: expected 1075970048 or 1084358656, got {0}")]
    InvalidMarker(i32),

    /// Mapping offset stored in the header is negative
    #[error("invalid mapping offset: {0}")]
    InvalidMappingOffset(i64),

    /// Mapping table starts past the end of the file
    #[error("mapping offset {offset} lies outside the file ({file_len} bytes)")]
    MappingOutOfBounds {
        /// Offset stored in the header
        offset: u64,
        /// Length of the file
        file_len: u64,
    },

    /// Mapping count is negative or cannot fit in the remaining bytes
    #[error("invalid mapping count {count} ({available} bytes available after the count)")]
    InvalidMappingCount {
        /// Count read from the file
        count: i32,
        /// Bytes available for entries
        available: u64,
    },

    /// Mapping table has more entries than the on-disk count can express
    #[error("mapping table too large: {0} entries")]
    MappingTooLarge(usize),

    /// Offset does not fit into the 48-bit packed representation
    #[error("record offset {0:#x} does not fit in 48 bits")]
    OffsetOutOfRange(u64),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRead(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<binrw::Error> for FormatError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(io) => Self::Io(io),
            other => Self::BinRead(other.to_string()),
        }
    }
}

/// Errors raised while decoding, transforming or encoding one texture record.
///
/// A record error only concerns the record at hand; callers merging many
/// records are expected to skip the record and carry on.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Stored payload length exceeds the accepted limit
    #[error("payload length {len} exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Length read from the record header
        len: u64,
        /// Maximum accepted length
        limit: u64,
    },

    /// Record would extend past the end of the file it is stored in
    #[error("record at {offset} ends at {end}, past the end of the file ({file_len} bytes)")]
    PastEndOfFile {
        /// Offset of the record
        offset: u64,
        /// Offset one past the record's last byte
        end: u64,
        /// Length of the file
        file_len: u64,
    },

    /// Payload length is negative (HTC streams store it signed)
    #[error("negative payload length: {0}")]
    NegativeLength(i32),

    /// zlib inflate failed
    #[error("decompression failed: {0}")]
    Inflate(String),

    /// zlib deflate failed
    #[error("compression failed: {0}")]
    Deflate(String),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRead(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<binrw::Error> for RecordError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(io) => Self::Io(io),
            other => Self::BinRead(other.to_string()),
        }
    }
}

/// Result type for file-level format operations
pub type Result<T> = std::result::Result<T, FormatError>;

/// Result type for record operations
pub type RecordResult<T> = std::result::Result<T, RecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FormatError::InvalidMarker(999);
        assert!(err.to_string().contains("999"));
        assert!(err.to_string().contains("1075970048"));

        let err = FormatError::InvalidMappingCount {
            count: -1,
            available: 12,
        };
        assert!(err.to_string().contains("-1"));

        let err = RecordError::PayloadTooLarge { len: 10, limit: 5 };
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_binrw_io_error_is_preserved() {
        let io = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        let err: RecordError = binrw::Error::Io(io).into();
        assert!(matches!(err, RecordError::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }
}
