//! HTC texture stream records
//!
//! HTC is the older cache layout: a gzip stream holding a 4-byte config word
//! followed by records until end of stream, each prefixed by its checksum.
//! There is no mapping table, so the stream can only be read front to back.
//!
//! ```text
//! u64 checksum
//! i32 width, i32 height, u32 format
//! u16 texture_format, u16 pixel_type, u8 is_hires_tex
//! i32 data_size
//! u8  data[data_size]
//! ```
//!
//! The reader works on any [`Read`]; wrap the file in a gzip decoder first.

use crate::arena::BufferArena;
use crate::error::{RecordError, RecordResult};
use crate::offset::FormatSize;
use crate::record::{RecordHeader, TextureRecord};
use binrw::{BinRead, BinWrite};
use std::io::{self, Cursor, Read, Write};

const HTC_RECORD_HEADER_SIZE: usize = 29;

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
struct HtcRecordHeader {
    checksum: u64,
    width: i32,
    height: i32,
    format: u32,
    texture_format: u16,
    pixel_type: u16,
    is_hires_tex: u8,
    data_size: i32,
}

/// Read the config word at the start of an HTC stream
pub fn read_htc_config<R: Read>(reader: &mut R) -> RecordResult<i32> {
    let mut word = [0u8; 4];
    reader.read_exact(&mut word)?;
    Ok(i32::from_le_bytes(word))
}

/// Write the config word at the start of an HTC stream
pub fn write_htc_config<W: Write>(writer: &mut W, config: i32) -> RecordResult<()> {
    writer.write_all(&config.to_le_bytes())?;
    Ok(())
}

/// One record of an HTC stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtcRecord {
    /// Content checksum
    pub checksum: u64,
    /// Decoded texture (payload inflated if it was stored compressed)
    pub record: TextureRecord,
}

impl HtcRecord {
    /// Read the next record, or `None` at a clean end of stream
    ///
    /// A stream that ends inside a record yields an `UnexpectedEof` I/O error.
    pub fn read_next<R: Read>(
        reader: &mut R,
        arena: &mut BufferArena,
    ) -> RecordResult<Option<Self>> {
        let mut raw = [0u8; HTC_RECORD_HEADER_SIZE];
        if !read_exact_or_eof(reader, &mut raw)? {
            return Ok(None);
        }

        let header = HtcRecordHeader::read(&mut Cursor::new(&raw))?;
        let payload_len = u32::try_from(header.data_size)
            .map_err(|_| RecordError::NegativeLength(header.data_size))?;

        let record_header = RecordHeader {
            width: header.width,
            height: header.height,
            format: header.format,
            texture_format: header.texture_format,
            pixel_type: header.pixel_type,
            is_hires_tex: header.is_hires_tex,
            format_size: FormatSize::default(),
            payload_len,
        };
        let record = TextureRecord::decode_payload(reader, record_header, arena)?;

        Ok(Some(Self {
            checksum: header.checksum,
            record,
        }))
    }

    /// Write the record in HTC layout, payload as it currently is
    pub fn write_to<W: Write>(&self, writer: &mut W) -> RecordResult<()> {
        let data_size = i32::try_from(self.record.payload.len()).map_err(|_| {
            RecordError::PayloadTooLarge {
                len: self.record.payload.len() as u64,
                limit: i32::MAX as u64,
            }
        })?;
        let header = HtcRecordHeader {
            checksum: self.checksum,
            width: self.record.width,
            height: self.record.height,
            format: self.record.format,
            texture_format: self.record.texture_format,
            pixel_type: self.record.pixel_type,
            is_hires_tex: self.record.is_hires_tex,
            data_size,
        };

        let mut raw = Vec::with_capacity(HTC_RECORD_HEADER_SIZE);
        header.write(&mut Cursor::new(&mut raw))?;
        writer.write_all(&raw)?;
        writer.write_all(&self.record.payload)?;
        Ok(())
    }
}

/// Fill `buf` completely, or return `false` if the stream ended before any byte
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside an HTC record header",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
