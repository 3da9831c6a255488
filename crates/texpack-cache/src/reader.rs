//! Read-only access to an existing HTS cache

use crate::{CacheError, Result};
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use texpack_formats::{
    BufferArena, CacheHeader, FormatError, FormatVersion, MappingEntry, MappingTable,
    RecordError, RecordHeader, RecordResult, TextureRecord,
};
use tracing::debug;

/// An open cache file with a parsed header
pub struct CacheReader {
    path: PathBuf,
    file: BufReader<File>,
    header: CacheHeader,
    file_len: u64,
}

impl CacheReader {
    /// Open a cache and parse its header
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened and `Format` if the header
    /// marker is unknown.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| CacheError::io(&path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| CacheError::io(&path, e))?
            .len();

        let mut file = BufReader::new(file);
        let header = CacheHeader::parse(&mut file).map_err(|e| CacheError::format(&path, e))?;
        debug!(
            "Opened {} ({} layout, compressed: {}, mapping at {})",
            path.display(),
            header.version,
            header.compressed,
            header.mapping_offset
        );

        Ok(Self {
            path,
            file,
            header,
            file_len,
        })
    }

    /// Path the cache was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed file header
    pub const fn header(&self) -> &CacheHeader {
        &self.header
    }

    /// Record layout of this cache
    pub const fn version(&self) -> FormatVersion {
        self.header.version
    }

    /// Size of the file in bytes
    pub const fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Read the whole mapping table
    ///
    /// # Errors
    ///
    /// Returns `Format` if the mapping offset or the entry count points past
    /// the end of the file.
    pub fn read_mapping(&mut self) -> Result<MappingTable> {
        let offset = self.header.mapping_offset;
        if offset > self.file_len {
            return Err(CacheError::format(
                &self.path,
                FormatError::MappingOutOfBounds {
                    offset,
                    file_len: self.file_len,
                },
            ));
        }

        self.seek(offset)?;
        let version = self.version();
        let table = MappingTable::read_from(&mut self.file, version, self.file_len - offset)
            .map_err(|e| CacheError::format(&self.path, e))?;
        debug!("Read {} mapping entries from {}", table.len(), self.path.display());
        Ok(table)
    }

    /// Decode the full record an entry points at
    ///
    /// Seek failures are reported as `Io`; anything that goes wrong while
    /// decoding is a record-level error the caller may skip. A payload length
    /// reaching past the end of the file is rejected before any buffer is
    /// sized for it.
    pub fn read_record(
        &mut self,
        entry: &MappingEntry,
        arena: &mut BufferArena,
    ) -> Result<RecordResult<TextureRecord>> {
        let version = self.version();
        let offset = entry.offset.offset(version);
        self.seek(offset)?;

        let header = match RecordHeader::decode(&mut self.file, version) {
            Ok(header) => header,
            Err(e) => return Ok(Err(e)),
        };
        let end = offset.saturating_add(header.footprint(version));
        if end > self.file_len {
            return Ok(Err(RecordError::PastEndOfFile {
                offset,
                end,
                file_len: self.file_len,
            }));
        }
        Ok(TextureRecord::decode_payload(&mut self.file, header, arena))
    }

    /// Decode only the fixed fields of the record an entry points at
    pub fn read_record_header(
        &mut self,
        entry: &MappingEntry,
    ) -> Result<RecordResult<RecordHeader>> {
        let version = self.version();
        self.seek(entry.offset.offset(version))?;
        Ok(RecordHeader::decode(&mut self.file, version))
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| CacheError::io(&self.path, e))?;
        Ok(())
    }
}

impl std::fmt::Debug for CacheReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("file_len", &self.file_len)
            .finish_non_exhaustive()
    }
}
