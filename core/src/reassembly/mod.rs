//! Receive-side frame reassembly.
//!
//! Responsibilities:
//! - Reject structurally invalid packets one at a time
//! - Collect the packets of one frame per packet kind
//! - Apply completed frames to the tracker store
//!
//! Non-responsibilities:
//! - Byte decoding (see `packet`)
//! - Threads and sockets (see `client`)

pub mod types;
pub mod assembler;

pub use types::{FramePart, ReassemblyEvent, RejectReason};
pub use assembler::FrameAssembler;
