//! constants.rs
//! Protocol constants for PosiStageNet.
//!
//! Every chunk id lives in the module of the container that owns it. Ids are
//! only unique inside their parent, so the same small integer shows up in
//! several vocabularies (`data_packet::TRACKER_LIST` and
//! `info_packet::SYSTEM_NAME` are both `0x0001`).

use std::net::Ipv4Addr;

/// Protocol version stamped into every frame header (PSN 2.03).
pub const PSN_VERSION_HIGH: u8 = 2;
pub const PSN_VERSION_LOW: u8 = 3;

/// Default multicast group and port.
pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(236, 10, 10, 10);
pub const DEFAULT_PORT: u16 = 56565;

/// Default send rates.
pub const DEFAULT_DATA_RATE_HZ: u32 = 60;
pub const DEFAULT_INFO_RATE_HZ: u32 = 1;

/// Largest datagram the fragmenter is allowed to emit.
pub const MAX_PACKET_LEN: usize = 1500;

/// Chunk header layout: bits[0:16) id, bits[16:31) data length, bit 31 children.
pub const CHUNK_HEADER_LEN: usize = 4;
pub const MAX_CHUNK_DATA_LEN: usize = 0x7FFF;
pub const DATA_LEN_SHIFT: u32 = 16;
pub const DATA_LEN_MASK: u32 = 0x7FFF;
pub const HAS_CHILDREN_BIT: u32 = 1 << 31;

/// Payload sizes of fixed-width leaves.
pub const FRAME_HEADER_PAYLOAD_LEN: usize = 12;
pub const FLOAT3_PAYLOAD_LEN: usize = 12;
pub const STATUS_PAYLOAD_LEN: usize = 4;
pub const TIMESTAMP_PAYLOAD_LEN: usize = 8;

/// Root chunk ids.
pub mod root_ids {
    pub const DATA_PACKET: u16 = 0x6755;
    pub const INFO_PACKET: u16 = 0x6756;
}

/// Children of a data packet root.
pub mod data_packet {
    pub const FRAME_HEADER: u16 = 0x0000;
    pub const TRACKER_LIST: u16 = 0x0001;
}

/// Children of an info packet root.
pub mod info_packet {
    pub const FRAME_HEADER: u16 = 0x0000;
    pub const SYSTEM_NAME: u16 = 0x0001;
    pub const TRACKER_LIST: u16 = 0x0002;
}

/// Children of one tracker inside a data tracker list.
pub mod data_tracker {
    pub const POSITION: u16 = 0x0000;
    pub const SPEED: u16 = 0x0001;
    pub const ORIENTATION: u16 = 0x0002;
    pub const STATUS: u16 = 0x0003;
    pub const ACCELERATION: u16 = 0x0004;
    pub const TARGET_POSITION: u16 = 0x0005;
    pub const TIMESTAMP: u16 = 0x0006;
}

/// Children of one tracker inside an info tracker list.
pub mod info_tracker {
    pub const NAME: u16 = 0x0000;
}
