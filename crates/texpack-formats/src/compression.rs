//! zlib payload compression
//!
//! Records only store their on-disk length, so inflation has to discover the
//! decompressed size: the destination starts at twice the compressed size and
//! doubles whenever it fills up, until the stream ends. Inflation runs with
//! `FlushDecompress::None` so a call that fills the buffer can be resumed.

use crate::error::{RecordError, RecordResult};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

/// Maximum allowed decompression size (1 GB)
///
/// A high-resolution texture is a few tens of MB at most; anything larger is
/// a corrupt stream.
pub const MAX_DECOMPRESSION_SIZE: usize = 1024 * 1024 * 1024;

/// Smallest initial inflate buffer, for tiny or empty inputs
const MIN_INFLATE_CAPACITY: usize = 64;

/// Inflate a zlib stream into `dst`, replacing its contents
pub fn inflate_into(src: &[u8], dst: &mut Vec<u8>) -> RecordResult<()> {
    dst.clear();
    dst.reserve(src.len().saturating_mul(2).max(MIN_INFLATE_CAPACITY));

    let mut inflater = Decompress::new(true);
    loop {
        let consumed = inflater.total_in() as usize;
        let produced_before = dst.len();

        let status = inflater
            .decompress_vec(&src[consumed..], dst, FlushDecompress::None)
            .map_err(|e| RecordError::Inflate(e.to_string()))?;

        if status == Status::StreamEnd {
            return Ok(());
        }

        if dst.len() < dst.capacity() {
            // Room left but no end of stream: input ran out
            let stalled = dst.len() == produced_before && inflater.total_in() as usize == consumed;
            if stalled || inflater.total_in() as usize == src.len() {
                return Err(RecordError::Inflate("truncated zlib stream".to_string()));
            }
            continue;
        }

        // Buffer full: double it and keep inflating where we stopped
        let grown = dst.capacity().saturating_mul(2);
        if grown > MAX_DECOMPRESSION_SIZE {
            return Err(RecordError::Inflate(format!(
                "decompressed size exceeds limit of {} bytes",
                MAX_DECOMPRESSION_SIZE
            )));
        }
        dst.reserve(grown - dst.len());
    }
}

/// Deflate `src` at the fastest level into `dst`, replacing its contents
pub fn deflate_into(src: &[u8], dst: &mut Vec<u8>) -> RecordResult<()> {
    let mut buffer = std::mem::take(dst);
    buffer.clear();

    let mut encoder = ZlibEncoder::new(buffer, Compression::fast());
    encoder
        .write_all(src)
        .map_err(|e| RecordError::Deflate(e.to_string()))?;
    *dst = encoder
        .finish()
        .map_err(|e| RecordError::Deflate(e.to_string()))?;
    Ok(())
}
