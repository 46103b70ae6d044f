//! psn-core
//!
//! PosiStageNet protocol core: chunk codec, packet model, fragmentation,
//! frame reassembly and tracker state, plus a threaded server and client
//! over UDP multicast.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod config;
pub mod telemetry;

// Wire format
pub mod headers;
pub mod chunk;
pub mod packet;

// Protocol
pub mod tracker;
pub mod fragment;
pub mod reassembly;
pub mod store;

// Runtime
pub mod encoder;
pub mod decoder;
pub mod transport;
pub mod server;
pub mod client;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::client::Client;
    pub use crate::config::{ClientConfig, ServerConfig};
    pub use crate::decoder::Decoder;
    pub use crate::encoder::Encoder;
    pub use crate::packet::PacketKind;
    pub use crate::reassembly::{ReassemblyEvent, RejectReason};
    pub use crate::server::Server;
    pub use crate::store::TrackerMap;
    pub use crate::tracker::{Float3, Tracker};
    pub use crate::transport::{LoopbackTransport, Transport, UdpMulticastTransport};
    pub use crate::types::PsnError;
}
