//! Merging two caches into a new one
//!
//! The first input decides the output layout and compression mode. Entries
//! of the first input are placed, then entries of the second, so on a key
//! collision the second input wins. A colliding record reuses the space of
//! the record it replaces when its encoded form fits there, otherwise it is
//! appended and the mapping entry repointed.

use crate::config::ensure_distinct;
use crate::reader::CacheReader;
use crate::writer::CacheWriter;
use crate::{CacheError, Result};
use std::fmt;
use std::path::Path;
use texpack_formats::{
    BufferArena, BufferPurpose, CacheHeader, FormatSize, FormatVersion, MappingTable,
    TextureRecord,
};
use tracing::{debug, info, warn};

/// Where a record ended up in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// New key, appended at the end
    Appended,
    /// Existing key, written over the previous record
    ReplacedInPlace,
    /// Existing key, too large for the previous record's space
    Relocated,
}

/// Outcome of a merge run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Final output header
    pub header: CacheHeader,
    /// Records appended under a new key
    pub appended: usize,
    /// Records that overwrote an earlier record in place
    pub replaced_in_place: usize,
    /// Records that replaced an earlier one but had to be appended
    pub relocated: usize,
    /// Records skipped because they could not be decoded or converted
    pub skipped: usize,
    /// Entries in the output mapping table
    pub entries: usize,
}

impl MergeReport {
    const fn empty(header: CacheHeader) -> Self {
        Self {
            header,
            appended: 0,
            replaced_in_place: 0,
            relocated: 0,
            skipped: 0,
            entries: 0,
        }
    }

    const fn count(&mut self, placement: Placement) {
        match placement {
            Placement::Appended => self.appended += 1,
            Placement::ReplacedInPlace => self.replaced_in_place += 1,
            Placement::Relocated => self.relocated += 1,
        }
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries ({} appended, {} replaced in place, {} relocated, {} skipped)",
            self.entries, self.appended, self.replaced_in_place, self.relocated, self.skipped
        )
    }
}

/// Check that records of `second` can be stored in a `first`-layout output
///
/// # Errors
///
/// Returns `UnsupportedCombination` for a Legacy first input with a Current
/// second input, since the Legacy output cannot hold format/size tags.
pub fn check_combination(first: FormatVersion, second: FormatVersion) -> Result<()> {
    match (first, second) {
        (FormatVersion::Legacy, FormatVersion::Current) => {
            Err(CacheError::UnsupportedCombination { first, second })
        }
        _ => Ok(()),
    }
}

/// Incremental merge into one output cache
///
/// Feed inputs with [`absorb`](Self::absorb) in priority order (later wins),
/// then call [`finish`](Self::finish).
#[derive(Debug)]
pub struct MergeEngine {
    writer: CacheWriter,
    mapping: MappingTable,
    report: MergeReport,
}

impl MergeEngine {
    /// Start a merge on a freshly created writer
    pub fn new(writer: CacheWriter) -> Self {
        let mapping = MappingTable::new(writer.version());
        let report = MergeReport::empty(CacheHeader::placeholder(
            writer.version(),
            writer.compressed(),
        ));
        Self {
            writer,
            mapping,
            report,
        }
    }

    /// Place every entry of `mapping`, read from `reader`, into the output
    ///
    /// Records that fail to decode or convert are logged and skipped. I/O
    /// failures on either file abort the merge.
    pub fn absorb(
        &mut self,
        reader: &mut CacheReader,
        mapping: &MappingTable,
        arena: &mut BufferArena,
    ) -> Result<()> {
        check_combination(self.writer.version(), reader.version())?;
        info!(
            "Merging {} entries from {}",
            mapping.len(),
            reader.path().display()
        );

        for entry in mapping.entries() {
            let tag = entry.offset.tag(reader.version());
            let record = match reader.read_record(entry, arena)? {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        "Skipping record {:#018x} of {}: {}",
                        entry.checksum,
                        reader.path().display(),
                        e
                    );
                    self.report.skipped += 1;
                    continue;
                }
            };

            match self.place(entry.checksum, tag, record, arena) {
                Ok(placement) => {
                    debug!("{:#018x} tag {}: {:?}", entry.checksum, tag, placement);
                    self.report.count(placement);
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping record {:#018x}: {}", entry.checksum, e);
                    self.report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Place one decoded record, returning its buffers to the arena
    pub fn place(
        &mut self,
        checksum: u64,
        tag: FormatSize,
        mut record: TextureRecord,
        arena: &mut BufferArena,
    ) -> Result<Placement> {
        let mut encoded = arena.take(BufferPurpose::OutputRecord);
        let result = self.place_encoded(checksum, tag, &mut record, &mut encoded, arena);
        arena.give_back(BufferPurpose::OutputRecord, encoded);
        arena.give_back(BufferPurpose::InputRecord, record.into_payload());
        result
    }

    fn place_encoded(
        &mut self,
        checksum: u64,
        tag: FormatSize,
        record: &mut TextureRecord,
        encoded: &mut Vec<u8>,
        arena: &mut BufferArena,
    ) -> Result<Placement> {
        let version = self.writer.version();

        if let Some(existing) = self.mapping.get(checksum, tag) {
            let footprint = self.writer.read_header_at(existing)?.footprint(version);
            if record.fits_within(footprint, version, self.writer.compressed(), arena)? {
                self.writer.encode_record(record, encoded, arena)?;
                self.writer.overwrite_at(existing, footprint, encoded)?;
                return Ok(Placement::ReplacedInPlace);
            }

            self.writer.encode_record(record, encoded, arena)?;
            let offset = self.writer.append(encoded)?;
            self.insert(checksum, tag, offset)?;
            return Ok(Placement::Relocated);
        }

        self.writer.encode_record(record, encoded, arena)?;
        let offset = self.writer.append(encoded)?;
        self.insert(checksum, tag, offset)?;
        Ok(Placement::Appended)
    }

    fn insert(&mut self, checksum: u64, tag: FormatSize, offset: u64) -> Result<()> {
        self.mapping
            .insert(checksum, tag, offset)
            .map_err(|e| CacheError::format(self.writer.path(), e))?;
        Ok(())
    }

    /// Write the mapping table, backpatch the header and return the report
    pub fn finish(self) -> Result<MergeReport> {
        let header = self.writer.finish(&self.mapping)?;
        Ok(MergeReport {
            header,
            entries: self.mapping.len(),
            ..self.report
        })
    }
}

/// Merge `first` and `second` into `output` with a fresh buffer arena
///
/// # Errors
///
/// Fails before `output` is created if either input is unreadable, has an
/// invalid header or mapping table, or the layouts cannot be combined.
pub fn merge_caches(
    first: impl AsRef<Path>,
    second: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<MergeReport> {
    let mut arena = BufferArena::new();
    merge_with_arena(first, second, output, &mut arena)
}

/// Merge `first` and `second` into `output`, reusing `arena`'s buffers
pub fn merge_with_arena(
    first: impl AsRef<Path>,
    second: impl AsRef<Path>,
    output: impl AsRef<Path>,
    arena: &mut BufferArena,
) -> Result<MergeReport> {
    let (first, second, output) = (first.as_ref(), second.as_ref(), output.as_ref());
    ensure_distinct(output, &[first, second])?;

    let mut first_reader = CacheReader::open(first)?;
    let mut second_reader = CacheReader::open(second)?;
    check_combination(first_reader.version(), second_reader.version())?;

    let first_mapping = first_reader.read_mapping()?;
    let second_mapping = second_reader.read_mapping()?;

    let header = *first_reader.header();
    info!(
        "Writing {} ({} layout, compressed: {})",
        output.display(),
        header.version,
        header.compressed
    );
    let writer = CacheWriter::create(output, header.version, header.compressed)?;

    let mut engine = MergeEngine::new(writer);
    engine.absorb(&mut first_reader, &first_mapping, arena)?;
    engine.absorb(&mut second_reader, &second_mapping, arena)?;
    let report = engine.finish()?;

    info!("Merged into {}: {}", output.display(), report);
    if report.skipped > 0 {
        warn!("{} records could not be merged", report.skipped);
    }
    Ok(report)
}
