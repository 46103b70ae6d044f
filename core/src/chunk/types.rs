use bytes::Bytes;
use thiserror::Error;

use crate::headers::{ChunkHeader, HeaderError};

/// Untyped chunk tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkNode {
    pub chunk_id: u16,
    pub body: ChunkBody,
}

/// Either raw leaf bytes or an ordered list of children.
///
/// A container may be empty; it still carries the has-children bit on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkBody {
    Leaf(Bytes),
    Container(Vec<ChunkNode>),
}

impl ChunkNode {
    pub fn leaf(chunk_id: u16, payload: impl Into<Bytes>) -> Self {
        Self { chunk_id, body: ChunkBody::Leaf(payload.into()) }
    }

    pub fn container(chunk_id: u16, children: Vec<ChunkNode>) -> Self {
        Self { chunk_id, body: ChunkBody::Container(children) }
    }

    pub fn has_children(&self) -> bool {
        matches!(self.body, ChunkBody::Container(_))
    }

    pub fn children(&self) -> &[ChunkNode] {
        match &self.body {
            ChunkBody::Container(children) => children,
            ChunkBody::Leaf(_) => &[],
        }
    }

    /// Bytes after this node's header.
    pub fn data_len(&self) -> usize {
        match &self.body {
            ChunkBody::Leaf(payload) => payload.len(),
            ChunkBody::Container(children) => children.iter().map(ChunkNode::encoded_len).sum(),
        }
    }

    /// Header plus data, descendants included.
    pub fn encoded_len(&self) -> usize {
        ChunkHeader::LEN + self.data_len()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// Declared region runs past the bytes available in the parent.
    #[error("chunk 0x{chunk_id:04x} truncated: declares {declared} bytes, {available} available")]
    Truncated { chunk_id: u16, declared: usize, available: usize },

    /// Bytes left inside a container that cannot hold another header.
    #[error("{remaining} stray bytes inside container 0x{parent_id:04x}")]
    StrayBytes { parent_id: u16, remaining: usize },

    /// Fixed-width leaf with the wrong payload size.
    #[error("chunk 0x{chunk_id:04x} payload is {actual} bytes, expected {expected}")]
    PayloadLength { chunk_id: u16, expected: usize, actual: usize },

    /// A chunk that must have children was sent as a leaf (or the reverse).
    #[error("chunk 0x{chunk_id:04x} has unexpected shape (has_children = {has_children})")]
    UnexpectedShape { chunk_id: u16, has_children: bool },

    /// Containers nested deeper than the decoder follows.
    #[error("chunk 0x{chunk_id:04x} nested deeper than {max_depth} levels")]
    TooDeep { chunk_id: u16, max_depth: usize },

    /// Writer misuse: `end` without `begin`, or open containers at finish.
    #[error("unbalanced chunk writer: {0}")]
    Unbalanced(&'static str),
}
