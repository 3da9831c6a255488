//! Cache file header
//!
//! Two layouts exist, told apart by the first 32-bit word:
//!
//! - Legacy: `i32 marker`, `i64 mapping_offset` (12 bytes)
//! - Current: `i32 version (0x0800_0000)`, `i32 marker`, `i64 mapping_offset` (16 bytes)
//!
//! The marker doubles as the compression flag of the whole file. All fields
//! are little-endian.

use crate::error::{FormatError, Result};
use binrw::{BinRead, BinResult, BinWrite};
use std::io::{Read, Seek, Write};

/// Version word that introduces a Current-format header
pub const FORMAT_VERSION_MAGIC: i32 = 0x0800_0000;

/// Header marker of a cache whose records are stored uncompressed
pub const MARKER_UNCOMPRESSED: i32 = 1_075_970_048; // 0x4022_0000

/// Header marker of a cache whose records are zlib-compressed
pub const MARKER_COMPRESSED: i32 = 1_084_358_656; // 0x40A2_0000

/// On-disk layout generation of a cache file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    /// No version word; records carry no format/size tag
    Legacy,
    /// Version word present; records and mapping offsets carry a 16-bit tag
    Current,
}

impl FormatVersion {
    /// Whether records and packed offsets carry the format/size tag
    pub const fn has_format_size(self) -> bool {
        matches!(self, Self::Current)
    }

    /// Size of the file header in bytes
    pub const fn header_size(self) -> u64 {
        match self {
            Self::Legacy => 12,
            Self::Current => 16,
        }
    }

    /// Position of the `mapping_offset` field inside the header
    pub const fn mapping_offset_position(self) -> u64 {
        match self {
            Self::Legacy => 4,
            Self::Current => 8,
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Current => write!(f, "current"),
        }
    }
}

/// Parsed cache header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHeader {
    /// Layout generation
    pub version: FormatVersion,
    /// Whether records are stored compressed
    pub compressed: bool,
    /// Absolute offset of the mapping table
    pub mapping_offset: u64,
}

impl CacheHeader {
    /// Create a header with a zero mapping offset, to be backpatched later
    pub const fn placeholder(version: FormatVersion, compressed: bool) -> Self {
        Self {
            version,
            compressed,
            mapping_offset: 0,
        }
    }

    /// Marker value written for this header's compression mode
    pub const fn marker(&self) -> i32 {
        if self.compressed {
            MARKER_COMPRESSED
        } else {
            MARKER_UNCOMPRESSED
        }
    }

    /// Map a marker value to its compression mode
    pub fn compression_from_marker(marker: i32) -> Result<bool> {
        match marker {
            MARKER_UNCOMPRESSED => Ok(false),
            MARKER_COMPRESSED => Ok(true),
            other => Err(FormatError::InvalidMarker(other)),
        }
    }

    /// Parse and validate a header from the start of `reader`
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let first = i32::read_le(reader)?;
        let (version, marker) = if first == FORMAT_VERSION_MAGIC {
            (FormatVersion::Current, i32::read_le(reader)?)
        } else {
            (FormatVersion::Legacy, first)
        };

        let compressed = Self::compression_from_marker(marker)?;

        let raw_offset = i64::read_le(reader)?;
        let mapping_offset =
            u64::try_from(raw_offset).map_err(|_| FormatError::InvalidMappingOffset(raw_offset))?;

        Ok(Self {
            version,
            compressed,
            mapping_offset,
        })
    }

    /// Serialize the header into a fresh buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.version.header_size() as usize);
        self.write_le(&mut std::io::Cursor::new(&mut buffer))?;
        Ok(buffer)
    }
}

impl BinWrite for CacheHeader {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        if self.version == FormatVersion::Current {
            FORMAT_VERSION_MAGIC.write_le(writer)?;
        }
        self.marker().write_le(writer)?;
        // Offsets past i64::MAX cannot come from a real file
        (self.mapping_offset as i64).write_le(writer)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(words: &[i32], mapping_offset: i64) -> Vec<u8> {
        let mut data = Vec::new();
        for word in words {
            data.extend_from_slice(&word.to_le_bytes());
        }
        data.extend_from_slice(&mapping_offset.to_le_bytes());
        data
    }

    #[test]
    fn test_marker_constants() {
        assert_eq!(MARKER_UNCOMPRESSED, 0x4022_0000);
        assert_eq!(MARKER_COMPRESSED, 0x40A2_0000);
    }

    #[test]
    fn test_parse_legacy_header() {
        let data = header_bytes(&[MARKER_UNCOMPRESSED], 1234);
        let header = CacheHeader::parse(&mut Cursor::new(&data)).expect("legacy header");

        assert_eq!(header.version, FormatVersion::Legacy);
        assert!(!header.compressed);
        assert_eq!(header.mapping_offset, 1234);
    }

    #[test]
    fn test_parse_current_compressed_header() {
        let data = header_bytes(&[FORMAT_VERSION_MAGIC, MARKER_COMPRESSED], 99);
        let header = CacheHeader::parse(&mut Cursor::new(&data)).expect("current header");

        assert_eq!(header.version, FormatVersion::Current);
        assert!(header.compressed);
        assert_eq!(header.mapping_offset, 99);
    }

    #[test]
    fn test_reject_unknown_marker() {
        let data = header_bytes(&[999], 0);
        let result = CacheHeader::parse(&mut Cursor::new(&data));
        assert!(matches!(result, Err(FormatError::InvalidMarker(999))));

        let data = header_bytes(&[FORMAT_VERSION_MAGIC, 999], 0);
        let result = CacheHeader::parse(&mut Cursor::new(&data));
        assert!(matches!(result, Err(FormatError::InvalidMarker(999))));
    }

    #[test]
    fn test_reject_negative_mapping_offset() {
        let data = header_bytes(&[MARKER_UNCOMPRESSED], -8);
        let result = CacheHeader::parse(&mut Cursor::new(&data));
        assert!(matches!(result, Err(FormatError::InvalidMappingOffset(-8))));
    }

    #[test]
    fn test_truncated_header_is_io_error() {
        let data = MARKER_UNCOMPRESSED.to_le_bytes();
        let result = CacheHeader::parse(&mut Cursor::new(&data));
        assert!(matches!(result, Err(FormatError::Io(_))));
    }

    #[test]
    fn test_write_sizes_match_layout() {
        for version in [FormatVersion::Legacy, FormatVersion::Current] {
            let header = CacheHeader {
                version,
                compressed: true,
                mapping_offset: 0x0102_0304,
            };
            let bytes = header.to_bytes().expect("serialize");
            assert_eq!(bytes.len() as u64, version.header_size());

            let pos = version.mapping_offset_position() as usize;
            assert_eq!(&bytes[pos..pos + 8], &0x0102_0304_i64.to_le_bytes());

            let parsed = CacheHeader::parse(&mut Cursor::new(&bytes)).expect("parse back");
            assert_eq!(parsed, header);
        }
    }
}
