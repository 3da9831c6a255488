//! Binary codec for HTS hi-res texture cache files
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
//! An HTS file stores pre-processed replacement textures keyed by a 64-bit
//! content checksum:
//!
//! ```text
//! header            marker(s) + i64 mapping_offset
//! record*           fixed fields + u32 length + payload
//! mapping table     i32 count + count x { u64 checksum, i64 packed_offset }
//! ```
//!
//! Two layouts exist. **Legacy** files start directly with the marker and
//! store plain offsets. **Current** files start with a version word and tag
//! every record (and mapping entry) with a 16-bit N64 format/size value, so
//! the same checksum may appear once per tag.
//!
//! Record payloads are optionally zlib-compressed; the file-level marker
//! says which mode a file uses and the top bit of each record's `format`
//! says whether that record's payload actually is compressed.
//!
//! # Usage
//!
//! ```rust
//! use texpack_formats::{BufferArena, FormatVersion, RecordHeader, TextureRecord};
//! use std::io::Cursor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut arena = BufferArena::new();
//! let mut record = TextureRecord {
//!     width: 2,
//!     height: 1,
//!     payload: vec![0xFF; 8],
//!     ..TextureRecord::default()
//! };
//!
//! let mut bytes = Vec::new();
//! record.encode(&mut Cursor::new(&mut bytes), FormatVersion::Current, true, &mut arena)?;
//!
//! let header = RecordHeader::decode(&mut Cursor::new(&bytes), FormatVersion::Current)?;
//! assert!(header.is_compressed());
//!
//! let decoded = TextureRecord::decode(&mut Cursor::new(&bytes), FormatVersion::Current, &mut arena)?;
//! assert_eq!(decoded.payload, vec![0xFF; 8]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod arena;
pub mod compression;
pub mod error;
pub mod header;
/// Gzip-wrapped HTC record stream, the input of the upgrader
pub mod htc;
pub mod mapping;
pub mod naming;
pub mod offset;
pub mod record;

pub use arena::{BufferArena, BufferPurpose};
pub use error::{FormatError, RecordError, RecordResult, Result};
pub use header::{
    CacheHeader, FORMAT_VERSION_MAGIC, FormatVersion, MARKER_COMPRESSED, MARKER_UNCOMPRESSED,
};
pub use htc::HtcRecord;
pub use mapping::{MappingEntry, MappingKey, MappingTable};
pub use offset::{FormatSize, PackedOffset};
pub use record::{GZ_FORMAT_FLAG, RecordHeader, TextureRecord};
