//! Texture record codec
//!
//! A record sits at the offset its mapping entry points to:
//!
//! ```text
//! i32 width
//! i32 height
//! u32 format            top bit set = payload is zlib-compressed
//! u16 texture_format
//! u16 pixel_type
//! u8  is_hires_tex
//! u16 format_size       Current format only
//! u32 payload_len
//! u8  payload[payload_len]
//! ```
//!
//! Decoding always yields an uncompressed payload. Before a record is
//! written it is [prepared](TextureRecord::prepare) for the target file's
//! compression mode; preparation converts the payload in place and is
//! idempotent, so measuring a record with
//! [`fits_within`](TextureRecord::fits_within) and then encoding it only
//! pays for the conversion once.

use crate::arena::{BufferArena, BufferPurpose};
use crate::compression::{deflate_into, inflate_into};
use crate::error::{RecordError, RecordResult};
use crate::header::FormatVersion;
use crate::offset::FormatSize;
use binrw::{BinRead, BinResult, BinWrite};
use std::io::{Read, Seek, Write};

/// Compression flag in the record's `format` field
pub const GZ_FORMAT_FLAG: u32 = 0x8000_0000;

/// Largest payload length accepted from disk (1 GB)
pub const MAX_PAYLOAD_SIZE: u64 = 1024 * 1024 * 1024;

/// Fixed fields of a record, without the payload bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordHeader {
    /// Texture width in pixels
    pub width: i32,
    /// Texture height in pixels
    pub height: i32,
    /// GL pixel format, with [`GZ_FORMAT_FLAG`] marking compression
    pub format: u32,
    /// GL texture format
    pub texture_format: u16,
    /// GL pixel type
    pub pixel_type: u16,
    /// Non-zero for hi-res replacement textures
    pub is_hires_tex: u8,
    /// N64 format/size tag (Current only, zero otherwise)
    pub format_size: FormatSize,
    /// On-disk payload length
    pub payload_len: u32,
}

impl RecordHeader {
    /// Size of the fixed fields for the given layout
    pub const fn fixed_size(version: FormatVersion) -> u64 {
        match version {
            FormatVersion::Legacy => 21,
            FormatVersion::Current => 23,
        }
    }

    /// Bytes the record occupies on disk, header included
    pub const fn footprint(&self, version: FormatVersion) -> u64 {
        Self::fixed_size(version) + self.payload_len as u64
    }

    /// Whether the stored payload is compressed
    pub const fn is_compressed(&self) -> bool {
        self.format & GZ_FORMAT_FLAG != 0
    }

    /// Read only the fixed fields
    pub fn decode<R: Read + Seek>(reader: &mut R, version: FormatVersion) -> RecordResult<Self> {
        Ok(Self::read_options(reader, binrw::Endian::Little, version)?)
    }
}

impl BinRead for RecordHeader {
    type Args<'a> = FormatVersion;

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        version: Self::Args<'_>,
    ) -> BinResult<Self> {
        let width = i32::read_le(reader)?;
        let height = i32::read_le(reader)?;
        let format = u32::read_le(reader)?;
        let texture_format = u16::read_le(reader)?;
        let pixel_type = u16::read_le(reader)?;
        let is_hires_tex = u8::read_le(reader)?;
        let format_size = if version.has_format_size() {
            FormatSize::read_le(reader)?
        } else {
            FormatSize::default()
        };
        let payload_len = u32::read_le(reader)?;

        Ok(Self {
            width,
            height,
            format,
            texture_format,
            pixel_type,
            is_hires_tex,
            format_size,
            payload_len,
        })
    }
}

impl BinWrite for RecordHeader {
    type Args<'a> = FormatVersion;

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        version: Self::Args<'_>,
    ) -> BinResult<()> {
        self.width.write_le(writer)?;
        self.height.write_le(writer)?;
        self.format.write_le(writer)?;
        self.texture_format.write_le(writer)?;
        self.pixel_type.write_le(writer)?;
        self.is_hires_tex.write_le(writer)?;
        if version.has_format_size() {
            self.format_size.write_le(writer)?;
        }
        self.payload_len.write_le(writer)?;
        Ok(())
    }
}

/// One decoded texture record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureRecord {
    /// Texture width in pixels
    pub width: i32,
    /// Texture height in pixels
    pub height: i32,
    /// GL pixel format; [`GZ_FORMAT_FLAG`] tracks the payload's current state
    pub format: u32,
    /// GL texture format
    pub texture_format: u16,
    /// GL pixel type
    pub pixel_type: u16,
    /// Non-zero for hi-res replacement textures
    pub is_hires_tex: u8,
    /// N64 format/size tag, only persisted in Current files
    pub format_size: FormatSize,
    /// Payload bytes, compressed iff `format` carries [`GZ_FORMAT_FLAG`]
    pub payload: Vec<u8>,
}

impl TextureRecord {
    /// Decode a full record at the current position of `reader`
    ///
    /// The payload buffer comes from the arena's `InputRecord` slot; hand it
    /// back with [`into_payload`](Self::into_payload) once the record is done.
    /// A compressed payload is inflated and the flag cleared.
    pub fn decode<R: Read + Seek>(
        reader: &mut R,
        version: FormatVersion,
        arena: &mut BufferArena,
    ) -> RecordResult<Self> {
        let header = RecordHeader::decode(reader, version)?;
        Self::decode_payload(reader, header, arena)
    }

    /// Read the payload described by an already decoded header
    pub fn decode_payload<R: Read>(
        reader: &mut R,
        header: RecordHeader,
        arena: &mut BufferArena,
    ) -> RecordResult<Self> {
        let len = u64::from(header.payload_len);
        if len > MAX_PAYLOAD_SIZE {
            return Err(RecordError::PayloadTooLarge {
                len,
                limit: MAX_PAYLOAD_SIZE,
            });
        }

        let mut payload = arena.take(BufferPurpose::InputRecord);
        payload.resize(header.payload_len as usize, 0);
        if let Err(e) = reader.read_exact(&mut payload) {
            arena.give_back(BufferPurpose::InputRecord, payload);
            return Err(e.into());
        }

        let mut record = Self::from_parts(header, payload);
        if let Err(e) = record.prepare(false, arena) {
            arena.give_back(BufferPurpose::InputRecord, record.into_payload());
            return Err(e);
        }
        Ok(record)
    }

    /// Assemble a record from its header fields and raw payload
    pub fn from_parts(header: RecordHeader, payload: Vec<u8>) -> Self {
        Self {
            width: header.width,
            height: header.height,
            format: header.format,
            texture_format: header.texture_format,
            pixel_type: header.pixel_type,
            is_hires_tex: header.is_hires_tex,
            format_size: header.format_size,
            payload,
        }
    }

    /// Whether the payload is currently compressed
    pub const fn is_compressed(&self) -> bool {
        self.format & GZ_FORMAT_FLAG != 0
    }

    /// Header describing the record exactly as it would be written now
    pub fn header(&self) -> RecordResult<RecordHeader> {
        let payload_len = u32::try_from(self.payload.len()).map_err(|_| {
            RecordError::PayloadTooLarge {
                len: self.payload.len() as u64,
                limit: u64::from(u32::MAX),
            }
        })?;
        Ok(RecordHeader {
            width: self.width,
            height: self.height,
            format: self.format,
            texture_format: self.texture_format,
            pixel_type: self.pixel_type,
            is_hires_tex: self.is_hires_tex,
            format_size: self.format_size,
            payload_len,
        })
    }

    /// Convert the payload to the requested representation
    ///
    /// Compresses (fastest level) or inflates as needed and keeps the
    /// [`GZ_FORMAT_FLAG`] in sync. Does nothing if the payload is already in
    /// the requested form.
    pub fn prepare(&mut self, compressed: bool, arena: &mut BufferArena) -> RecordResult<()> {
        if self.is_compressed() == compressed {
            return Ok(());
        }

        let mut scratch = arena.take(BufferPurpose::Compression);
        let result = if compressed {
            deflate_into(&self.payload, &mut scratch)
        } else {
            inflate_into(&self.payload, &mut scratch)
        };
        if let Err(e) = result {
            arena.give_back(BufferPurpose::Compression, scratch);
            return Err(e);
        }

        std::mem::swap(&mut self.payload, &mut scratch);
        arena.give_back(BufferPurpose::Compression, scratch);

        if compressed {
            self.format |= GZ_FORMAT_FLAG;
        } else {
            self.format &= !GZ_FORMAT_FLAG;
        }
        Ok(())
    }

    /// Encoded size in bytes with the payload in its current form
    pub fn encoded_len(&self, version: FormatVersion) -> u64 {
        RecordHeader::fixed_size(version) + self.payload.len() as u64
    }

    /// Whether the record, converted for a file with the given compression
    /// mode, takes at most `budget` bytes
    ///
    /// The conversion is applied to `self`, so a following
    /// [`encode`](Self::encode) with the same mode does no further work.
    pub fn fits_within(
        &mut self,
        budget: u64,
        version: FormatVersion,
        compressed: bool,
        arena: &mut BufferArena,
    ) -> RecordResult<bool> {
        self.prepare(compressed, arena)?;
        Ok(self.encoded_len(version) <= budget)
    }

    /// Convert the payload for the target compression mode and write the
    /// record, returning the number of bytes written
    pub fn encode<W: Write + Seek>(
        &mut self,
        writer: &mut W,
        version: FormatVersion,
        compressed: bool,
        arena: &mut BufferArena,
    ) -> RecordResult<u64> {
        self.prepare(compressed, arena)?;
        self.write_to(writer, version)
    }

    /// Write the record as it is, without converting the payload
    pub fn write_to<W: Write + Seek>(
        &self,
        writer: &mut W,
        version: FormatVersion,
    ) -> RecordResult<u64> {
        let header = self.header()?;
        header.write_options(writer, binrw::Endian::Little, version)?;
        writer.write_all(&self.payload)?;
        Ok(self.encoded_len(version))
    }

    /// Take the payload buffer out, e.g. to return it to the arena
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
