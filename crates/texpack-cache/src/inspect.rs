//! Cache summaries for the `inspect` command

use crate::reader::CacheReader;
use crate::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use texpack_formats::naming::{cache_ident, texture_file_name};
use texpack_formats::{CacheHeader, FORMAT_VERSION_MAGIC, FormatSize, FormatVersion, RecordHeader};
use tracing::warn;

/// Header and mapping summary of one cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// Inspected file
    pub path: PathBuf,
    /// Parsed header
    pub header: CacheHeader,
    /// File size in bytes
    pub file_len: u64,
    /// Entries in the mapping table
    pub entry_count: usize,
    /// Per-entry details, empty unless requested
    pub entries: Vec<EntrySummary>,
}

/// One mapping entry and the header of the record it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    /// Content checksum
    pub checksum: u64,
    /// Format/size tag, zero in Legacy caches
    pub tag: FormatSize,
    /// Record offset
    pub offset: u64,
    /// Fixed fields of the record, `None` if they could not be read
    pub record: Option<RecordHeader>,
    /// Image file name a texture pack would use for this entry
    pub texture_name: String,
}

impl Inspection {
    /// Raw header marker value
    pub const fn marker(&self) -> i32 {
        self.header.marker()
    }
}

/// Summarize the cache at `path`, optionally reading every record header
///
/// # Errors
///
/// Fails if the header or mapping table is invalid. Unreadable records only
/// leave their summary's `record` empty.
pub fn inspect(path: impl AsRef<Path>, with_entries: bool) -> Result<Inspection> {
    let mut reader = CacheReader::open(path)?;
    let mapping = reader.read_mapping()?;

    let ident = ident_for(reader.path());
    let mut entries = Vec::new();
    if with_entries {
        entries.reserve(mapping.len());
        for entry in mapping.entries() {
            let record = match reader.read_record_header(entry)? {
                Ok(header) => Some(header),
                Err(e) => {
                    warn!("Cannot read record {:#018x}: {}", entry.checksum, e);
                    None
                }
            };
            entries.push(EntrySummary {
                checksum: entry.checksum,
                tag: entry.offset.tag(reader.version()),
                offset: entry.offset.offset(reader.version()),
                record,
                texture_name: texture_file_name(&ident, entry.checksum),
            });
        }
    }

    Ok(Inspection {
        path: reader.path().to_path_buf(),
        header: *reader.header(),
        file_len: reader.file_len(),
        entry_count: mapping.len(),
        entries,
    })
}

/// Game identifier from the cache name, or the file stem as a fallback
fn ident_for(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    match cache_ident(name) {
        Some(ident) => ident.to_string(),
        None => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File:           {}", self.path.display())?;
        writeln!(f, "Size:           {} bytes", self.file_len)?;
        if self.header.version == FormatVersion::Current {
            writeln!(f, "Version marker: {:#010x}", FORMAT_VERSION_MAGIC)?;
        }
        writeln!(f, "Header marker:  {:#010x}", self.marker())?;
        writeln!(f, "Layout:         {}", self.header.version)?;
        writeln!(f, "Compressed:     {}", self.header.compressed)?;
        writeln!(f, "Mapping offset: {}", self.header.mapping_offset)?;
        write!(f, "Entries:        {}", self.entry_count)?;
        for entry in &self.entries {
            write!(f, "\n{entry}")?;
        }
        Ok(())
    }
}

impl fmt::Display for EntrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#018x} tag {} @ {:>10}",
            self.checksum, self.tag, self.offset
        )?;
        match &self.record {
            Some(record) => write!(
                f,
                "  {}x{} format {:#010x} tex {:#06x} type {:#06x} hires {} {} bytes{}",
                record.width,
                record.height,
                record.format,
                record.texture_format,
                record.pixel_type,
                record.is_hires_tex,
                record.payload_len,
                if record.is_compressed() { " (zlib)" } else { "" }
            )?,
            None => write!(f, "  <unreadable>")?,
        }
        write!(f, "  {}", self.texture_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_from_cache_name() {
        assert_eq!(
            ident_for(Path::new("/caches/MARIO KART 64_HIRESTEXTURES.hts")),
            "MARIO KART 64"
        );
        assert_eq!(ident_for(Path::new("merged.hts")), "merged");
    }
}
