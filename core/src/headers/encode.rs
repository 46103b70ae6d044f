//! headers/encode.rs
//!
//! Chunk header encoding.
//!
//! Design notes:
//! - One little-endian word per header.
//! - `patch_chunk_header` supports the buffer-and-patch writer: a placeholder
//!   is reserved first, the real length is written once children are done.

use byteorder::{ByteOrder, LittleEndian};

use crate::headers::types::{ChunkHeader, HeaderError};

/// Serialize a chunk header into its 4-byte wire form.
///
/// # Errors
/// `HeaderError::DataLenTooLarge` if `data_len` does not fit 15 bits.
#[inline]
pub fn encode_chunk_header_le(h: &ChunkHeader) -> Result<[u8; ChunkHeader::LEN], HeaderError> {
    let mut out = [0u8; ChunkHeader::LEN];
    LittleEndian::write_u32(&mut out, h.to_word()?);
    Ok(out)
}

/// Append a header to `out`.
#[inline]
pub fn put_chunk_header(out: &mut Vec<u8>, h: &ChunkHeader) -> Result<(), HeaderError> {
    out.extend_from_slice(&encode_chunk_header_le(h)?);
    Ok(())
}

/// Overwrite the header at `offset` (placeholder previously reserved).
///
/// Caller guarantees `out[offset..offset + 4]` exists.
pub fn patch_chunk_header(out: &mut [u8], offset: usize, h: &ChunkHeader) -> Result<(), HeaderError> {
    let have = out.len().saturating_sub(offset);
    if have < ChunkHeader::LEN {
        return Err(HeaderError::BufferTooShort { have, need: ChunkHeader::LEN });
    }
    LittleEndian::write_u32(&mut out[offset..offset + ChunkHeader::LEN], h.to_word()?);
    Ok(())
}
