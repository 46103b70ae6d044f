//! headers/decode.rs
//!
//! Chunk header decoding.

use byteorder::{ByteOrder, LittleEndian};

use crate::headers::types::{ChunkHeader, HeaderError};

/// Deserialize the header at the start of `buf`.
///
/// # Returns
/// - `Ok(ChunkHeader)` whenever at least four bytes are available.
/// - `Err(HeaderError::BufferTooShort)` otherwise (end of stream).
#[inline]
pub fn decode_chunk_header_le(buf: &[u8]) -> Result<ChunkHeader, HeaderError> {
    if buf.len() < ChunkHeader::LEN {
        return Err(HeaderError::BufferTooShort { have: buf.len(), need: ChunkHeader::LEN });
    }
    Ok(ChunkHeader::from_word(LittleEndian::read_u32(&buf[..ChunkHeader::LEN])))
}
