//! Typed PSN packets.
//!
//! Responsibilities:
//! - Give each container level its own sum type (`DataPacketChunk`,
//!   `DataTrackerChunk`, `InfoPacketChunk`, `InfoTrackerChunk`)
//! - Encode packets through the chunk writer
//! - Decode packets through per-container dispatch tables
//!
//! Non-responsibilities:
//! - Frame completeness (see `reassembly`)
//! - MTU budgeting (see `fragment`)

pub mod types;
pub mod encode;
pub mod decode;

pub use types::*;
pub use encode::{encode_data_packet, encode_info_packet, encode_packet, frame_header_payload};
pub use decode::{decode_packet, parse_frame_header_payload};
