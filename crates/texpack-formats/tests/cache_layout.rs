#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests assembling complete HTS images in memory
//!
//! Each test lays out header, records and mapping table the way a cache
//! writer does, then walks the image back through the public parsing API.

use pretty_assertions::assert_eq;
use std::io::{Cursor, Seek, SeekFrom, Write};
use texpack_formats::{
    BufferArena, CacheHeader, FormatError, FormatSize, FormatVersion, MappingTable, RecordHeader,
    TextureRecord,
};

fn texture(seed: u8, len: usize, tag: FormatSize) -> TextureRecord {
    TextureRecord {
        width: 16,
        height: i32::from(seed),
        format: 0x8058,
        texture_format: 0x1908,
        pixel_type: 0x1401,
        is_hires_tex: 1,
        format_size: tag,
        payload: (0..len).map(|i| seed.wrapping_add((i / 3) as u8)).collect(),
    }
}

fn build_image(
    version: FormatVersion,
    compressed: bool,
    textures: &[(u64, TextureRecord)],
) -> Vec<u8> {
    let mut arena = BufferArena::new();
    let mut image = Vec::new();
    let mut cursor = Cursor::new(&mut image);

    let placeholder = CacheHeader::placeholder(version, compressed);
    cursor
        .write_all(&placeholder.to_bytes().expect("header bytes"))
        .unwrap();

    let mut mapping = MappingTable::new(version);
    for (checksum, record) in textures {
        let offset = cursor.stream_position().unwrap();
        record
            .clone()
            .encode(&mut cursor, version, compressed, &mut arena)
            .expect("encode record");
        mapping
            .insert(*checksum, record.format_size, offset)
            .expect("insert mapping");
    }

    let mapping_offset = cursor.stream_position().unwrap();
    mapping.write_to(&mut cursor).expect("write mapping");

    let header = CacheHeader {
        mapping_offset,
        ..placeholder
    };
    cursor.seek(SeekFrom::Start(0)).unwrap();
    cursor.write_all(&header.to_bytes().unwrap()).unwrap();

    image
}

fn read_image(image: &[u8]) -> (CacheHeader, Vec<(u64, TextureRecord)>) {
    let mut arena = BufferArena::new();
    let mut cursor = Cursor::new(image);
    let header = CacheHeader::parse(&mut cursor).expect("parse header");

    cursor.seek(SeekFrom::Start(header.mapping_offset)).unwrap();
    let mapping = MappingTable::read_from(
        &mut cursor,
        header.version,
        image.len() as u64 - header.mapping_offset,
    )
    .expect("read mapping");

    let mut records = Vec::new();
    for entry in mapping.entries() {
        cursor
            .seek(SeekFrom::Start(entry.offset.offset(header.version)))
            .unwrap();
        let record =
            TextureRecord::decode(&mut cursor, header.version, &mut arena).expect("decode record");
        records.push((entry.checksum, record));
    }
    (header, records)
}

#[test]
fn current_uncompressed_image_round_trip() {
    let textures = vec![
        (0x0000_0000_1111_1111, texture(1, 300, FormatSize::new(2, 1))),
        (0x0000_00AA_2222_2222, texture(2, 40, FormatSize::new(0, 3))),
    ];
    let image = build_image(FormatVersion::Current, false, &textures);
    let (header, records) = read_image(&image);

    assert_eq!(header.version, FormatVersion::Current);
    assert!(!header.compressed);
    assert_eq!(records, textures);
}

#[test]
fn legacy_compressed_image_round_trip() {
    let textures = vec![
        (1, texture(7, 4096, FormatSize::default())),
        (2, texture(9, 0, FormatSize::default())),
    ];
    let image = build_image(FormatVersion::Legacy, true, &textures);
    let (header, records) = read_image(&image);

    assert_eq!(header.version, FormatVersion::Legacy);
    assert!(header.compressed);
    assert_eq!(records, textures);
}

#[test]
fn compressed_records_are_flagged_on_disk() {
    let textures = vec![(1, texture(3, 2048, FormatSize::default()))];
    let image = build_image(FormatVersion::Current, true, &textures);

    let mut cursor = Cursor::new(image.as_slice());
    cursor
        .seek(SeekFrom::Start(FormatVersion::Current.header_size()))
        .unwrap();
    let header = RecordHeader::decode(&mut cursor, FormatVersion::Current).expect("header");
    assert!(header.is_compressed());
    assert!(u64::from(header.payload_len) < 2048);
}

#[test]
fn same_checksum_different_tags_coexist() {
    let textures = vec![
        (0x42, texture(1, 64, FormatSize::new(2, 1))),
        (0x42, texture(2, 32, FormatSize::new(2, 0))),
    ];
    let image = build_image(FormatVersion::Current, false, &textures);
    let (_, records) = read_image(&image);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].1.format_size, FormatSize::new(2, 1));
    assert_eq!(records[1].1.format_size, FormatSize::new(2, 0));
}

#[test]
fn mapping_past_end_of_file_is_rejected() {
    let textures = vec![(1, texture(1, 8, FormatSize::default()))];
    let mut image = build_image(FormatVersion::Legacy, false, &textures);
    // Drop half of the only mapping entry
    image.truncate(image.len() - 8);

    let mut cursor = Cursor::new(image.as_slice());
    let header = CacheHeader::parse(&mut cursor).unwrap();
    cursor.seek(SeekFrom::Start(header.mapping_offset)).unwrap();
    let result = MappingTable::read_from(
        &mut cursor,
        header.version,
        image.len() as u64 - header.mapping_offset,
    );
    assert!(matches!(
        result,
        Err(FormatError::InvalidMappingCount { count: 1, .. })
    ));
}
