//! Output cache writer
//!
//! The writer owns a single read/write handle. Records are appended at the
//! handle's current position; reading a header of an earlier record or
//! overwriting one in place is a *detour* that always returns the cursor to
//! the append position, checked against the position taken before the detour.

use crate::{CacheError, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use texpack_formats::{
    BufferArena, CacheHeader, FormatVersion, MappingTable, RecordError, RecordHeader,
    RecordResult, TextureRecord,
};
use tracing::debug;

/// Writer for a new cache file
pub struct CacheWriter {
    path: PathBuf,
    file: File,
    header: CacheHeader,
}

impl CacheWriter {
    /// Create (or truncate) `path` and write a placeholder header
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be created or written.
    pub fn create(path: impl AsRef<Path>, version: FormatVersion, compressed: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| CacheError::io(&path, e))?;

        let header = CacheHeader::placeholder(version, compressed);
        let bytes = header
            .to_bytes()
            .map_err(|e| CacheError::format(&path, e))?;
        file.write_all(&bytes)
            .map_err(|e| CacheError::io(&path, e))?;

        debug!(
            "Created {} ({} layout, compressed: {})",
            path.display(),
            version,
            compressed
        );
        Ok(Self { path, file, header })
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record layout of the output
    pub const fn version(&self) -> FormatVersion {
        self.header.version
    }

    /// Whether records are stored compressed
    pub const fn compressed(&self) -> bool {
        self.header.compressed
    }

    /// Position the next appended record will start at
    pub fn append_position(&mut self) -> Result<u64> {
        self.file
            .stream_position()
            .map_err(|e| CacheError::io(&self.path, e))
    }

    /// Append raw bytes and return the offset they start at
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let offset = self.append_position()?;
        self.file
            .write_all(bytes)
            .map_err(|e| CacheError::io(&self.path, e))?;
        Ok(offset)
    }

    /// Serialize a record for this output into `buffer`
    ///
    /// The record is converted to the output's compression mode first.
    pub fn encode_record(
        &self,
        record: &mut TextureRecord,
        buffer: &mut Vec<u8>,
        arena: &mut BufferArena,
    ) -> RecordResult<()> {
        buffer.clear();
        record.encode(
            &mut Cursor::new(&mut *buffer),
            self.version(),
            self.compressed(),
            arena,
        )?;
        Ok(())
    }

    /// Read the fixed fields of the record stored at `offset`
    pub fn read_header_at(&mut self, offset: u64) -> Result<RecordHeader> {
        let version = self.version();
        self.detour(offset, |file| {
            RecordHeader::decode(file, version).map_err(|e| match e {
                RecordError::Io(io) => io,
                other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
            })
        })
    }

    /// Overwrite the record at `offset` with `bytes`
    ///
    /// # Errors
    ///
    /// Returns `FootprintExceeded` without touching the file if `bytes` is
    /// longer than the `footprint` of the record being replaced.
    pub fn overwrite_at(&mut self, offset: u64, footprint: u64, bytes: &[u8]) -> Result<()> {
        let len = bytes.len() as u64;
        if len > footprint {
            return Err(CacheError::FootprintExceeded {
                offset,
                footprint,
                len,
            });
        }
        self.detour(offset, |file| file.write_all(bytes))
    }

    /// Write the mapping table at the append position and backpatch the header
    ///
    /// Returns the final header.
    pub fn finish(mut self, mapping: &MappingTable) -> Result<CacheHeader> {
        let mapping_offset = self.append_position()?;

        let mut table = Vec::with_capacity(mapping.serialized_size() as usize);
        mapping
            .write_to(&mut Cursor::new(&mut table))
            .map_err(|e| CacheError::format(&self.path, e))?;
        self.append(&table)?;

        let header = CacheHeader {
            mapping_offset,
            ..self.header
        };
        let bytes = header
            .to_bytes()
            .map_err(|e| CacheError::format(&self.path, e))?;
        let patch_at = self.version().mapping_offset_position();
        self.detour(patch_at, |file| file.write_all(&bytes[patch_at as usize..]))?;

        self.file
            .flush()
            .map_err(|e| CacheError::io(&self.path, e))?;
        debug!(
            "Finished {}: {} entries, mapping at {}",
            self.path.display(),
            mapping.len(),
            mapping_offset
        );
        Ok(header)
    }

    /// Run `op` at `offset`, then return to the append position
    fn detour<T>(&mut self, offset: u64, op: impl FnOnce(&mut File) -> io::Result<T>) -> Result<T> {
        let expected = self.append_position()?;
        let value = self
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| op(&mut self.file))
            .map_err(|e| CacheError::io(&self.path, e))?;

        let actual = self
            .file
            .seek(SeekFrom::Start(expected))
            .map_err(|e| CacheError::io(&self.path, e))?;
        if actual != expected {
            return Err(CacheError::CursorMismatch { expected, actual });
        }
        Ok(value)
    }
}

impl std::fmt::Debug for CacheWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWriter")
            .field("path", &self.path)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::reader::CacheReader;
    use pretty_assertions::assert_eq;
    use texpack_formats::FormatSize;

    fn record(payload: &[u8]) -> TextureRecord {
        TextureRecord {
            width: 4,
            height: 4,
            format: 0x8058,
            texture_format: 0x1908,
            pixel_type: 0x1401,
            is_hires_tex: 1,
            format_size: FormatSize::new(2, 1),
            payload: payload.to_vec(),
        }
    }

    fn append(writer: &mut CacheWriter, record: &mut TextureRecord) -> u64 {
        let mut arena = BufferArena::new();
        let mut buffer = Vec::new();
        writer
            .encode_record(record, &mut buffer, &mut arena)
            .expect("encode");
        writer.append(&buffer).expect("append")
    }

    #[test]
    fn test_create_writes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.hts");
        let mut writer = CacheWriter::create(&path, FormatVersion::Current, true).unwrap();
        assert_eq!(writer.append_position().unwrap(), 16);
        drop(writer);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 16);
    }

    #[test]
    fn test_detours_restore_append_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.hts");
        let mut writer = CacheWriter::create(&path, FormatVersion::Legacy, false).unwrap();

        let first = append(&mut writer, &mut record(b"aaaaaaaa"));
        let end = writer.append_position().unwrap();

        let header = writer.read_header_at(first).unwrap();
        assert_eq!(header.payload_len, 8);
        assert_eq!(header.footprint(FormatVersion::Legacy), end - first);
        assert_eq!(writer.append_position().unwrap(), end);

        let mut arena = BufferArena::new();
        let mut buffer = Vec::new();
        writer
            .encode_record(&mut record(b"bbbb"), &mut buffer, &mut arena)
            .unwrap();
        writer
            .overwrite_at(first, header.footprint(FormatVersion::Legacy), &buffer)
            .unwrap();
        assert_eq!(writer.append_position().unwrap(), end);
    }

    #[test]
    fn test_overwrite_refuses_oversized_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.hts");
        let mut writer = CacheWriter::create(&path, FormatVersion::Legacy, false).unwrap();
        let first = append(&mut writer, &mut record(b"ab"));

        let result = writer.overwrite_at(first, 23, &[0u8; 24]);
        assert!(matches!(
            result,
            Err(CacheError::FootprintExceeded {
                footprint: 23,
                len: 24,
                ..
            })
        ));
        assert_eq!(writer.read_header_at(first).unwrap().payload_len, 2);
    }

    #[test]
    fn test_finish_backpatches_mapping_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.hts");
        let mut writer = CacheWriter::create(&path, FormatVersion::Current, false).unwrap();

        let mut mapping = MappingTable::new(FormatVersion::Current);
        let offset = append(&mut writer, &mut record(b"pixels"));
        mapping.insert(0xABCD, FormatSize::new(2, 1), offset).unwrap();
        let mapping_offset = writer.append_position().unwrap();
        let header = writer.finish(&mapping).unwrap();
        assert_eq!(header.mapping_offset, mapping_offset);

        let mut reader = CacheReader::open(&path).unwrap();
        assert_eq!(reader.header(), &header);
        let parsed = reader.read_mapping().unwrap();
        assert_eq!(parsed, mapping);

        let mut arena = BufferArena::new();
        let decoded = reader
            .read_record(&parsed.entries()[0], &mut arena)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, record(b"pixels"));
    }
}
