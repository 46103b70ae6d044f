//! Chunk tree encoding.
//!
//! Design notes:
//! - Depth-first pre-order output.
//! - A container header is reserved as a zero placeholder on `begin` and
//!   patched on `end`, once every descendant has been written.
//! - The 15-bit length limit is enforced at patch time, so an oversized
//!   container fails instead of wrapping.

use crate::chunk::types::{ChunkBody, ChunkError, ChunkNode};
use crate::headers::{patch_chunk_header, put_chunk_header, ChunkHeader};

/// Buffer-and-patch chunk writer.
#[derive(Debug, Default)]
pub struct ChunkWriter {
    buf: Vec<u8>,
    open: Vec<(u16, usize)>,
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { buf: Vec::with_capacity(cap), open: Vec::new() }
    }

    /// Open a container chunk.
    pub fn begin(&mut self, chunk_id: u16) {
        self.open.push((chunk_id, self.buf.len()));
        self.buf.extend_from_slice(&[0u8; ChunkHeader::LEN]);
    }

    /// Close the innermost container and patch its header.
    pub fn end(&mut self) -> Result<(), ChunkError> {
        let (chunk_id, offset) = self.open.pop().ok_or(ChunkError::Unbalanced("end without begin"))?;
        let data_len = self.buf.len() - offset - ChunkHeader::LEN;
        let header = ChunkHeader::new(chunk_id, data_len, true)?;
        patch_chunk_header(&mut self.buf, offset, &header)?;
        Ok(())
    }

    /// Write a container and its body in one call.
    pub fn container<F>(&mut self, chunk_id: u16, body: F) -> Result<(), ChunkError>
    where
        F: FnOnce(&mut Self) -> Result<(), ChunkError>,
    {
        self.begin(chunk_id);
        body(self)?;
        self.end()
    }

    /// Write a leaf chunk.
    pub fn leaf(&mut self, chunk_id: u16, payload: &[u8]) -> Result<(), ChunkError> {
        let header = ChunkHeader::new(chunk_id, payload.len(), false)?;
        put_chunk_header(&mut self.buf, &header)?;
        self.buf.extend_from_slice(payload);
        Ok(())
    }

    /// Write a chunk whose data region is already encoded (re-emitting an
    /// unknown chunk verbatim).
    pub fn opaque(&mut self, chunk_id: u16, has_children: bool, data: &[u8]) -> Result<(), ChunkError> {
        let header = ChunkHeader::new(chunk_id, data.len(), has_children)?;
        put_chunk_header(&mut self.buf, &header)?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Bytes written so far, open containers included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish writing. Fails if a container is still open.
    pub fn finish(self) -> Result<Vec<u8>, ChunkError> {
        if !self.open.is_empty() {
            return Err(ChunkError::Unbalanced("container left open"));
        }
        Ok(self.buf)
    }
}

/// Encode an untyped tree.
pub fn encode_tree(node: &ChunkNode) -> Result<Vec<u8>, ChunkError> {
    let mut w = ChunkWriter::with_capacity(node.encoded_len());
    write_node(&mut w, node)?;
    w.finish()
}

fn write_node(w: &mut ChunkWriter, node: &ChunkNode) -> Result<(), ChunkError> {
    match &node.body {
        ChunkBody::Leaf(payload) => w.leaf(node.chunk_id, payload),
        ChunkBody::Container(children) => w.container(node.chunk_id, |w| {
            children.iter().try_for_each(|child| write_node(w, child))
        }),
    }
}
