//! headers/mod.rs
//! The 4-byte chunk header that prefixes every PSN chunk.
//!
//! Layout (one little-endian `u32` word):
//!
//! ```text
//! bit 31      bits 16..31        bits 0..16
//! [children] [data_len (15 bits)] [chunk_id]
//! ```
//!
//! Notes:
//! - `data_len` counts the bytes after this header, descendants included.
//! - Decoding never fails on a full word; a short buffer is end-of-stream and
//!   the caller decides whether that is an error.

pub mod types;
pub mod encode;
pub mod decode;

pub use types::*;
pub use encode::*;
pub use decode::*;
