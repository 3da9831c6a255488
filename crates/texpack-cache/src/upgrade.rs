//! HTC to HTS conversion
//!
//! An HTC cache is read front to back and every record appended to a new
//! Current-layout, uncompressed HTS cache. HTC has no format/size tags, so
//! every entry gets tag zero. When a checksum repeats, the first record
//! wins and the later bytes stay in the file unreferenced.

use crate::error::ConfigError;
use crate::writer::CacheWriter;
use crate::{CacheError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use texpack_formats::htc::read_htc_config;
use texpack_formats::{
    BufferArena, BufferPurpose, CacheHeader, FormatSize, FormatVersion, HtcRecord, MappingTable,
    RecordError,
};
use tracing::{debug, info, warn};

/// Outcome of an upgrade run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeReport {
    /// Final output header
    pub header: CacheHeader,
    /// Records read from the HTC stream and written
    pub records: usize,
    /// Records whose checksum was already present
    pub duplicates: usize,
    /// Records dropped because their payload could not be inflated
    pub skipped: usize,
    /// Whether reading stopped early at a truncated or unreadable record
    pub truncated: bool,
    /// Entries in the output mapping table
    pub entries: usize,
}

impl std::fmt::Display for UpgradeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} entries ({} records, {} duplicates, {} skipped)",
            self.entries, self.records, self.duplicates, self.skipped
        )?;
        if self.truncated {
            write!(f, ", input truncated")?;
        }
        Ok(())
    }
}

/// Output path for an HTC input: the `.htc` extension replaced with `.hts`
///
/// # Errors
///
/// Returns `NotHtc` if the input does not end with `.htc` (any case).
pub fn default_output_path(input: &Path) -> std::result::Result<PathBuf, ConfigError> {
    match input.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("htc") => Ok(input.with_extension("hts")),
        _ => Err(ConfigError::NotHtc(input.to_path_buf())),
    }
}

/// Convert the HTC cache at `input` into an HTS cache at `output`
///
/// # Errors
///
/// Returns `Io` if either file cannot be opened or the gzip stream is
/// corrupt. A stream that ends inside a record is not an error: everything
/// before it is kept and the report is marked truncated.
pub fn upgrade_htc(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    arena: &mut BufferArena,
) -> Result<UpgradeReport> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let file = File::open(input).map_err(|e| CacheError::io(input, e))?;
    let mut stream = GzDecoder::new(BufReader::new(file));

    let config = read_htc_config(&mut stream).map_err(|e| input_error(input, e))?;
    debug!("{}: config word {:#010x}", input.display(), config);

    let mut writer = CacheWriter::create(output, FormatVersion::Current, false)?;
    let mut mapping = MappingTable::new(FormatVersion::Current);
    let mut report = UpgradeReport {
        header: CacheHeader::placeholder(FormatVersion::Current, false),
        records: 0,
        duplicates: 0,
        skipped: 0,
        truncated: false,
        entries: 0,
    };

    let mut encoded = arena.take(BufferPurpose::OutputRecord);
    loop {
        let htc = match HtcRecord::read_next(&mut stream, arena) {
            Ok(Some(htc)) => htc,
            Ok(None) => break,
            Err(RecordError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!(
                    "{} ends inside a record after {} records",
                    input.display(),
                    report.records
                );
                report.truncated = true;
                break;
            }
            // The payload was consumed, so the stream is still in sync
            Err(e @ RecordError::Inflate(_)) => {
                warn!("Skipping record of {}: {}", input.display(), e);
                report.skipped += 1;
                continue;
            }
            // No usable length, so the next record cannot be located
            Err(e @ (RecordError::NegativeLength(_) | RecordError::PayloadTooLarge { .. })) => {
                warn!(
                    "Stopping at record {} of {}: {}",
                    report.records,
                    input.display(),
                    e
                );
                report.truncated = true;
                break;
            }
            Err(e) => {
                arena.give_back(BufferPurpose::OutputRecord, encoded);
                return Err(input_error(input, e));
            }
        };

        let HtcRecord {
            checksum,
            mut record,
        } = htc;
        let appended = writer
            .encode_record(&mut record, &mut encoded, arena)
            .map_err(CacheError::from)
            .and_then(|()| writer.append(&encoded));
        arena.give_back(BufferPurpose::InputRecord, record.into_payload());

        let offset = match appended {
            Ok(offset) => offset,
            Err(e) => {
                arena.give_back(BufferPurpose::OutputRecord, encoded);
                return Err(e);
            }
        };
        if mapping.get(checksum, FormatSize::default()).is_some() {
            debug!("{:#018x} repeated, keeping the earlier record", checksum);
            report.duplicates += 1;
        } else {
            mapping
                .insert(checksum, FormatSize::default(), offset)
                .map_err(|e| CacheError::format(output, e))?;
        }
        report.records += 1;
    }
    arena.give_back(BufferPurpose::OutputRecord, encoded);

    report.header = writer.finish(&mapping)?;
    report.entries = mapping.len();
    info!(
        "Upgraded {} to {}: {}",
        input.display(),
        output.display(),
        report
    );
    Ok(report)
}

/// Errors reading the HTC stream are fatal for the run
fn input_error(input: &Path, error: RecordError) -> CacheError {
    match error {
        RecordError::Io(e) => CacheError::io(input, e),
        other => CacheError::Record(other),
    }
}
