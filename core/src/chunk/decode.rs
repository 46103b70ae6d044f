//! Bounded chunk traversal.
//!
//! A `ChunkReader` walks sibling chunks inside one region. Each yielded
//! `RawChunk` borrows exactly its declared data bytes, so a nested reader can
//! never see past its parent. Any underrun is an error for the whole walk;
//! callers drop the packet rather than salvage a prefix.

use crate::chunk::types::{ChunkBody, ChunkError, ChunkNode};
use crate::headers::{decode_chunk_header_le, ChunkHeader};

/// One chunk as it sits on the wire: header plus its declared data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunk<'a> {
    pub header: ChunkHeader,
    pub data: &'a [u8],
}

impl<'a> RawChunk<'a> {
    #[inline]
    pub fn id(&self) -> u16 {
        self.header.chunk_id
    }

    /// Reader over the children of this chunk.
    ///
    /// A leaf yields nothing, whatever its payload.
    pub fn children(&self) -> ChunkReader<'a> {
        if self.header.has_children {
            ChunkReader::nested(self.data, self.header.chunk_id)
        } else {
            ChunkReader::nested(&[], self.header.chunk_id)
        }
    }

    /// Payload of a fixed-width leaf, checked against `expected`.
    pub fn fixed_payload(&self, expected: usize) -> Result<&'a [u8], ChunkError> {
        if self.header.has_children {
            return Err(ChunkError::UnexpectedShape { chunk_id: self.id(), has_children: true });
        }
        if self.data.len() != expected {
            return Err(ChunkError::PayloadLength {
                chunk_id: self.id(),
                expected,
                actual: self.data.len(),
            });
        }
        Ok(self.data)
    }
}

/// Iterator over sibling chunks in one bounded region.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    buf: &'a [u8],
    pos: usize,
    parent_id: Option<u16>,
    failed: bool,
}

impl<'a> ChunkReader<'a> {
    /// Top-level reader over a whole datagram.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0, parent_id: None, failed: false }
    }

    fn nested(buf: &'a [u8], parent_id: u16) -> Self {
        Self { buf, pos: 0, parent_id: Some(parent_id), failed: false }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read the next sibling.
    ///
    /// # Returns
    /// - `Ok(None)` once the region is exactly consumed.
    /// - `Err` on a partial header inside a container or a region overrun.
    pub fn next_chunk(&mut self) -> Result<Option<RawChunk<'a>>, ChunkError> {
        if self.failed || self.pos == self.buf.len() {
            return Ok(None);
        }
        let rest = &self.buf[self.pos..];
        let header = match decode_chunk_header_le(rest) {
            Ok(h) => h,
            Err(e) => {
                self.failed = true;
                return Err(match self.parent_id {
                    Some(parent_id) => ChunkError::StrayBytes { parent_id, remaining: rest.len() },
                    None => ChunkError::Header(e),
                });
            }
        };

        let declared = header.data_len as usize;
        let available = rest.len() - ChunkHeader::LEN;
        if declared > available {
            self.failed = true;
            return Err(ChunkError::Truncated { chunk_id: header.chunk_id, declared, available });
        }

        let data = &rest[ChunkHeader::LEN..ChunkHeader::LEN + declared];
        self.pos += header.total_len();
        Ok(Some(RawChunk { header, data }))
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = Result<RawChunk<'a>, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

/// Deepest container nesting `decode_tree` follows. Known packets use four
/// levels; the bound keeps crafted input from exhausting the stack.
pub const MAX_TREE_DEPTH: usize = 32;

/// Decode the first chunk of `buf` into an untyped tree.
///
/// # Returns
/// The tree and the number of bytes it occupied.
///
/// # Errors
/// `ChunkError::TooDeep` if containers nest past `MAX_TREE_DEPTH`.
pub fn decode_tree(buf: &[u8]) -> Result<(ChunkNode, usize), ChunkError> {
    let mut reader = ChunkReader::new(buf);
    match reader.next_chunk()? {
        Some(raw) => Ok((decode_node(&raw, 1)?, raw.header.total_len())),
        None => Err(ChunkError::Header(crate::headers::HeaderError::BufferTooShort {
            have: 0,
            need: ChunkHeader::LEN,
        })),
    }
}

fn decode_node(raw: &RawChunk<'_>, depth: usize) -> Result<ChunkNode, ChunkError> {
    if !raw.header.has_children {
        return Ok(ChunkNode::leaf(raw.id(), raw.data.to_vec()));
    }
    if depth > MAX_TREE_DEPTH {
        return Err(ChunkError::TooDeep { chunk_id: raw.id(), max_depth: MAX_TREE_DEPTH });
    }
    let children = raw
        .children()
        .map(|child| child.and_then(|c| decode_node(&c, depth + 1)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ChunkNode { chunk_id: raw.id(), body: ChunkBody::Container(children) })
}
