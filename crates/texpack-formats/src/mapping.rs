//! Checksum to record mapping table
//!
//! The table sits at the end of a cache file:
//!
//! ```text
//! i32 count
//! count x { u64 checksum, i64 packed_offset }
//! ```
//!
//! Legacy tables are unique by checksum. Current tables are unique by
//! checksum *and* format/size tag, so one texture may have several encodings.

use crate::error::{FormatError, Result};
use crate::header::FormatVersion;
use crate::offset::{FormatSize, PackedOffset};
use binrw::{BinRead, BinWrite};
use std::collections::HashMap;
use std::io::{Read, Seek, Write};

/// Serialized size of one mapping entry
pub const MAPPING_ENTRY_SIZE: u64 = 16;

/// Single on-disk mapping entry
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct MappingEntry {
    /// Content checksum of the source texture
    pub checksum: u64,
    /// Packed record offset (and tag, in Current files)
    pub offset: PackedOffset,
}

/// Identity of a record inside a mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappingKey {
    /// Content checksum
    pub checksum: u64,
    /// Format/size tag, zero in Legacy tables
    pub tag: FormatSize,
}

/// Mapping table of one cache file
///
/// Entries keep their insertion order; re-inserting an existing key updates
/// the offset in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    version: FormatVersion,
    entries: Vec<MappingEntry>,
    index: HashMap<MappingKey, usize>,
}

impl MappingTable {
    /// Create an empty table for the given layout
    pub fn new(version: FormatVersion) -> Self {
        Self {
            version,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Layout the offsets are packed for
    pub const fn version(&self) -> FormatVersion {
        self.version
    }

    /// Number of distinct entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Key an entry is deduplicated under in this table
    pub const fn key(&self, checksum: u64, tag: FormatSize) -> MappingKey {
        let tag = match self.version {
            FormatVersion::Legacy => FormatSize(0),
            FormatVersion::Current => tag,
        };
        MappingKey { checksum, tag }
    }

    /// Key of a stored entry
    pub const fn entry_key(&self, entry: &MappingEntry) -> MappingKey {
        self.key(entry.checksum, entry.offset.tag(self.version))
    }

    /// Record offset stored for `checksum`/`tag`
    pub fn get(&self, checksum: u64, tag: FormatSize) -> Option<u64> {
        let key = self.key(checksum, tag);
        self.index
            .get(&key)
            .map(|&i| self.entries[i].offset.offset(self.version))
    }

    /// Insert or repoint an entry, returning the previous offset if any
    pub fn insert(&mut self, checksum: u64, tag: FormatSize, offset: u64) -> Result<Option<u64>> {
        let key = self.key(checksum, tag);
        let packed = PackedOffset::pack(self.version, offset, key.tag)?;
        let entry = MappingEntry {
            checksum,
            offset: packed,
        };

        if let Some(&i) = self.index.get(&key) {
            let previous = self.entries[i].offset.offset(self.version);
            self.entries[i] = entry;
            Ok(Some(previous))
        } else {
            self.index.insert(key, self.entries.len());
            self.entries.push(entry);
            Ok(None)
        }
    }

    /// Read a table whose count field is at the current position of `reader`
    ///
    /// `available` is the number of bytes between the count field and the
    /// end of the file; counts that cannot fit are rejected before any entry
    /// is read. Duplicate keys collapse onto the first occurrence's slot with
    /// the last occurrence's offset.
    pub fn read_from<R: Read + Seek>(
        reader: &mut R,
        version: FormatVersion,
        available: u64,
    ) -> Result<Self> {
        let count = i32::read_le(reader)?;
        let remaining = available.saturating_sub(4);

        let fits = u64::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(MAPPING_ENTRY_SIZE))
            .is_some_and(|needed| needed <= remaining);
        if !fits {
            return Err(FormatError::InvalidMappingCount {
                count,
                available: remaining,
            });
        }

        let mut table = Self::new(version);
        table.entries.reserve(count as usize);
        for _ in 0..count {
            let entry = MappingEntry::read_le(reader)?;
            let key = table.entry_key(&entry);
            if let Some(&i) = table.index.get(&key) {
                table.entries[i] = entry;
            } else {
                table.index.insert(key, table.entries.len());
                table.entries.push(entry);
            }
        }

        Ok(table)
    }

    /// Write the count and all entries
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        let count = i32::try_from(self.entries.len())
            .map_err(|_| FormatError::MappingTooLarge(self.entries.len()))?;
        count.write_le(writer)?;
        for entry in &self.entries {
            entry.write_le(writer)?;
        }
        Ok(())
    }

    /// Serialized size in bytes
    pub fn serialized_size(&self) -> u64 {
        4 + self.entries.len() as u64 * MAPPING_ENTRY_SIZE
    }
}
