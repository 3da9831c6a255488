//! Helpers shared by the integration tests: building cache files on disk
//! and reading them back in full.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::io::Cursor;
use std::path::Path;
use texpack_cache::{CacheReader, CacheWriter};
use texpack_formats::{
    BufferArena, CacheHeader, FormatSize, FormatVersion, MappingTable, TextureRecord,
};

/// One decoded output entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub checksum: u64,
    pub tag: FormatSize,
    pub offset: u64,
    pub record: TextureRecord,
}

pub fn texture(payload: &[u8], tag: FormatSize) -> TextureRecord {
    TextureRecord {
        width: 32,
        height: 16,
        format: 0x8058,
        texture_format: 0x1908,
        pixel_type: 0x1401,
        is_hires_tex: 1,
        format_size: tag,
        payload: payload.to_vec(),
    }
}

/// Payload that compresses well but is not a single repeated byte
pub fn pattern(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add((i % 7) as u8)).collect()
}

/// Write a cache whose records are encoded for the file's compression mode
pub fn write_cache(
    path: &Path,
    version: FormatVersion,
    compressed: bool,
    records: &[(u64, TextureRecord)],
) {
    let mut arena = BufferArena::new();
    let mut writer = CacheWriter::create(path, version, compressed).expect("create cache");
    let mut mapping = MappingTable::new(version);
    let mut buffer = Vec::new();

    for (checksum, record) in records {
        writer
            .encode_record(&mut record.clone(), &mut buffer, &mut arena)
            .expect("encode record");
        let offset = writer.append(&buffer).expect("append record");
        mapping
            .insert(*checksum, record.format_size, offset)
            .expect("insert entry");
    }
    writer.finish(&mapping).expect("finish cache");
}

/// Write a cache whose second record is stored with a broken zlib payload
pub fn write_cache_with_corrupt_record(
    path: &Path,
    version: FormatVersion,
    good: (u64, TextureRecord),
    corrupt_checksum: u64,
) {
    let mut arena = BufferArena::new();
    let mut writer = CacheWriter::create(path, version, false).expect("create cache");
    let mut mapping = MappingTable::new(version);
    let mut buffer = Vec::new();

    let (checksum, mut record) = good;
    writer
        .encode_record(&mut record, &mut buffer, &mut arena)
        .expect("encode record");
    let offset = writer.append(&buffer).unwrap();
    mapping.insert(checksum, record.format_size, offset).unwrap();

    let mut broken = texture(b"definitely not zlib", FormatSize::default());
    broken.format |= texpack_formats::GZ_FORMAT_FLAG;
    buffer.clear();
    broken
        .write_to(&mut Cursor::new(&mut buffer), version)
        .expect("raw write");
    let offset = writer.append(&buffer).unwrap();
    mapping
        .insert(corrupt_checksum, FormatSize::default(), offset)
        .unwrap();

    writer.finish(&mapping).unwrap();
}

/// Read header and every entry of a cache, in mapping order
pub fn read_cache(path: &Path) -> (CacheHeader, Vec<Entry>) {
    let mut arena = BufferArena::new();
    let mut reader = CacheReader::open(path).expect("open cache");
    let mapping = reader.read_mapping().expect("read mapping");
    let version = reader.version();

    let entries = mapping
        .entries()
        .iter()
        .map(|entry| Entry {
            checksum: entry.checksum,
            tag: entry.offset.tag(version),
            offset: entry.offset.offset(version),
            record: reader
                .read_record(entry, &mut arena)
                .expect("seek record")
                .expect("decode record"),
        })
        .collect();
    (*reader.header(), entries)
}

pub fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).expect("metadata").len()
}
