//! Chunk tree codec.
//!
//! Responsibilities:
//! - Walk a nested chunk tree bounded by declared lengths (`decode`)
//! - Emit a nested chunk tree with bottom-up lengths (`encode`)
//! - Provide an untyped `ChunkNode` tree for tooling and tests
//!
//! Non-responsibilities:
//! - Chunk id meaning (see `packet`)
//! - Frames, trackers, transport

pub mod types;
pub mod encode;
pub mod decode;

pub use types::{ChunkBody, ChunkError, ChunkNode};
pub use encode::{encode_tree, ChunkWriter};
pub use decode::{decode_tree, ChunkReader, RawChunk, MAX_TREE_DEPTH};
