//! Packed storage offsets and the per-record format/size tag
//!
//! Current-format mapping entries pack a 48-bit record offset into the low
//! bits and the record's 16-bit format/size tag into the high bits of one
//! 64-bit word. Legacy entries store a plain offset.

use crate::error::{FormatError, Result};
use crate::header::FormatVersion;
use binrw::{BinRead, BinWrite};

const OFFSET_BITS: u32 = 48;
const OFFSET_MASK: u64 = (1 << OFFSET_BITS) - 1;

/// Largest offset that fits into a packed Current-format entry
pub const MAX_PACKED_OFFSET: u64 = OFFSET_MASK;

/// N64 texel format and size pair stored with Current-format records
///
/// The low byte holds the format, the high byte the texel size. Two
/// encodings of the same source image (e.g. full-colour and palette) share a
/// checksum but differ in this tag.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[brw(little)]
pub struct FormatSize(pub u16);

impl FormatSize {
    /// Build a tag from its format and size halves
    pub const fn new(format: u8, size: u8) -> Self {
        Self(u16::from_le_bytes([format, size]))
    }

    /// N64 texel format
    pub const fn format(self) -> u8 {
        self.0.to_le_bytes()[0]
    }

    /// N64 texel size
    pub const fn size(self) -> u8 {
        self.0.to_le_bytes()[1]
    }
}

impl std::fmt::Display for FormatSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// 64-bit storage offset as found in a mapping entry
#[derive(BinRead, BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[brw(little)]
pub struct PackedOffset(u64);

impl PackedOffset {
    /// Wrap a raw on-disk value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw on-disk value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Pack an offset for the given layout
    ///
    /// Legacy offsets are stored as-is and the tag is dropped. Current
    /// offsets must fit in 48 bits.
    pub fn pack(version: FormatVersion, offset: u64, tag: FormatSize) -> Result<Self> {
        match version {
            FormatVersion::Legacy => Ok(Self(offset)),
            FormatVersion::Current => {
                if offset > OFFSET_MASK {
                    return Err(FormatError::OffsetOutOfRange(offset));
                }
                Ok(Self((u64::from(tag.0) << OFFSET_BITS) | offset))
            }
        }
    }

    /// Record offset relative to the start of the file
    pub const fn offset(self, version: FormatVersion) -> u64 {
        match version {
            FormatVersion::Legacy => self.0,
            FormatVersion::Current => self.0 & OFFSET_MASK,
        }
    }

    /// Format/size tag; always zero for Legacy entries
    pub const fn tag(self, version: FormatVersion) -> FormatSize {
        match version {
            FormatVersion::Legacy => FormatSize(0),
            FormatVersion::Current => FormatSize((self.0 >> OFFSET_BITS) as u16),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_halves() {
        let tag = FormatSize::new(0x02, 0x01);
        assert_eq!(tag.0, 0x0102);
        assert_eq!(tag.format(), 0x02);
        assert_eq!(tag.size(), 0x01);
        assert_eq!(tag.to_string(), "0x0102");
    }

    #[test]
    fn test_pack_current_layout() {
        let packed = PackedOffset::pack(FormatVersion::Current, 0x1234, FormatSize(0xBEEF))
            .expect("offset fits");
        assert_eq!(packed.raw(), 0xBEEF_0000_0000_1234);
        assert_eq!(packed.offset(FormatVersion::Current), 0x1234);
        assert_eq!(packed.tag(FormatVersion::Current), FormatSize(0xBEEF));
    }

    #[test]
    fn test_pack_legacy_ignores_tag() {
        let packed = PackedOffset::pack(FormatVersion::Legacy, 0x1234, FormatSize(0xBEEF))
            .expect("legacy never fails");
        assert_eq!(packed.raw(), 0x1234);
        assert_eq!(packed.tag(FormatVersion::Legacy), FormatSize(0));
    }

    #[test]
    fn test_high_tag_bit_does_not_leak_into_offset() {
        // A tag with the top bit set makes the raw i64 negative on disk
        let packed = PackedOffset::pack(FormatVersion::Current, MAX_PACKED_OFFSET, FormatSize(0xFFFF))
            .expect("offset fits");
        assert_eq!(packed.raw() as i64, -1);
        assert_eq!(packed.offset(FormatVersion::Current), MAX_PACKED_OFFSET);
        assert_eq!(packed.tag(FormatVersion::Current), FormatSize(0xFFFF));
    }

    #[test]
    fn test_reject_offset_over_48_bits() {
        let result = PackedOffset::pack(FormatVersion::Current, 1 << 48, FormatSize(0));
        assert!(matches!(result, Err(FormatError::OffsetOutOfRange(_))));
    }
}
