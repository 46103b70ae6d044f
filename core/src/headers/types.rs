//! headers/types.rs
//! Chunk header struct and its error type.

use thiserror::Error;

use crate::constants::{
    CHUNK_HEADER_LEN, DATA_LEN_MASK, DATA_LEN_SHIFT, HAS_CHILDREN_BIT, MAX_CHUNK_DATA_LEN,
};

/// Decoded chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkHeader {
    pub chunk_id: u16,
    /// Bytes following the header (children included). Must fit 15 bits.
    pub data_len: u16,
    pub has_children: bool,
}

impl ChunkHeader {
    pub const LEN: usize = CHUNK_HEADER_LEN;

    /// Construct a header, rejecting lengths that do not fit the 15-bit field.
    pub fn new(chunk_id: u16, data_len: usize, has_children: bool) -> Result<Self, HeaderError> {
        if data_len > MAX_CHUNK_DATA_LEN {
            return Err(HeaderError::DataLenTooLarge { len: data_len, max: MAX_CHUNK_DATA_LEN });
        }
        Ok(Self { chunk_id, data_len: data_len as u16, has_children })
    }

    /// Header plus the declared data region.
    #[inline]
    pub fn total_len(&self) -> usize {
        Self::LEN + self.data_len as usize
    }

    /// Pack into the wire word.
    pub fn to_word(&self) -> Result<u32, HeaderError> {
        let len = self.data_len as usize;
        if len > MAX_CHUNK_DATA_LEN {
            return Err(HeaderError::DataLenTooLarge { len, max: MAX_CHUNK_DATA_LEN });
        }
        let mut word = self.chunk_id as u32 | ((self.data_len as u32) << DATA_LEN_SHIFT);
        if self.has_children {
            word |= HAS_CHILDREN_BIT;
        }
        Ok(word)
    }

    /// Unpack a wire word. Total: every `u32` is a valid header.
    #[inline]
    pub fn from_word(word: u32) -> Self {
        Self {
            chunk_id: (word & 0xFFFF) as u16,
            data_len: ((word >> DATA_LEN_SHIFT) & DATA_LEN_MASK) as u16,
            has_children: word & HAS_CHILDREN_BIT != 0,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// Fewer than four bytes left; end of stream from the header's point of view.
    #[error("chunk header buffer too short: {have} < {need}")]
    BufferTooShort { have: usize, need: usize },

    /// Declared data length does not fit the 15-bit field.
    #[error("chunk data length {len} exceeds maximum {max}")]
    DataLenTooLarge { len: usize, max: usize },
}
