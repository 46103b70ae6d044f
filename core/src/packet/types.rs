use bytes::Bytes;
use num_enum::TryFromPrimitive;

use crate::constants::{
    root_ids, CHUNK_HEADER_LEN, FLOAT3_PAYLOAD_LEN, FRAME_HEADER_PAYLOAD_LEN, PSN_VERSION_HIGH,
    PSN_VERSION_LOW, STATUS_PAYLOAD_LEN, TIMESTAMP_PAYLOAD_LEN,
};
use crate::tracker::{Float3, Tracker};

/// Known root chunk ids.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum RootId {
    Data = root_ids::DATA_PACKET,
    Info = root_ids::INFO_PACKET,
}

/// Packet kind as identified by the root chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Data,
    Info,
    Unknown(u16),
}

impl PacketKind {
    pub fn from_root_id(raw: u16) -> Self {
        match RootId::try_from_primitive(raw) {
            Ok(RootId::Data) => PacketKind::Data,
            Ok(RootId::Info) => PacketKind::Info,
            Err(_) => PacketKind::Unknown(raw),
        }
    }

    pub fn root_id(&self) -> u16 {
        match self {
            PacketKind::Data => RootId::Data as u16,
            PacketKind::Info => RootId::Info as u16,
            PacketKind::Unknown(raw) => *raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PacketKind::Data => "data",
            PacketKind::Info => "info",
            PacketKind::Unknown(_) => "unknown",
        }
    }
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketKind::Unknown(raw) => write!(f, "unknown(0x{raw:04x})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Frame header chunk payload.
///
/// All fields are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    /// Microseconds.
    pub timestamp: u64,
    pub version_high: u8,
    pub version_low: u8,
    pub frame_id: u8,
    pub frame_packet_count: u8,
}

impl FrameHeader {
    pub const LEN: usize = FRAME_HEADER_PAYLOAD_LEN;

    /// Header stamped with the current protocol version.
    pub fn new(timestamp: u64, frame_id: u8, frame_packet_count: u8) -> Self {
        Self {
            timestamp,
            version_high: PSN_VERSION_HIGH,
            version_low: PSN_VERSION_LOW,
            frame_id,
            frame_packet_count,
        }
    }
}

/// A chunk whose id is not in its container's vocabulary.
///
/// Kept verbatim so it survives a decode/encode cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChunk {
    pub chunk_id: u16,
    pub has_children: bool,
    pub raw: Bytes,
}

impl UnknownChunk {
    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_LEN + self.raw.len()
    }
}

// ---------------------------------------------------------------------------
// Data packet vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DataTrackerChunk {
    Position(Float3),
    Speed(Float3),
    Orientation(Float3),
    Status(f32),
    Acceleration(Float3),
    TargetPosition(Float3),
    Timestamp(u64),
    Unknown(UnknownChunk),
}

impl DataTrackerChunk {
    pub fn encoded_len(&self) -> usize {
        use DataTrackerChunk::*;
        match self {
            Position(_) | Speed(_) | Orientation(_) | Acceleration(_) | TargetPosition(_) => {
                CHUNK_HEADER_LEN + FLOAT3_PAYLOAD_LEN
            }
            Status(_) => CHUNK_HEADER_LEN + STATUS_PAYLOAD_LEN,
            Timestamp(_) => CHUNK_HEADER_LEN + TIMESTAMP_PAYLOAD_LEN,
            Unknown(u) => u.encoded_len(),
        }
    }
}

/// One tracker in a data tracker list; the chunk id is the tracker id.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTrackerNode {
    pub id: u16,
    pub chunks: Vec<DataTrackerChunk>,
    /// Payload of a tracker that arrived as a leaf. When set, the tracker is
    /// re-emitted as that leaf and `chunks` is empty.
    pub leaf: Option<Bytes>,
}

impl DataTrackerNode {
    pub fn new(id: u16, chunks: Vec<DataTrackerChunk>) -> Self {
        Self { id, chunks, leaf: None }
    }

    /// Field chunks for every data field the tracker carries, in id order.
    pub fn from_tracker(t: &Tracker) -> Self {
        let mut chunks = Vec::with_capacity(7);
        if let Some(v) = t.pos {
            chunks.push(DataTrackerChunk::Position(v));
        }
        if let Some(v) = t.speed {
            chunks.push(DataTrackerChunk::Speed(v));
        }
        if let Some(v) = t.ori {
            chunks.push(DataTrackerChunk::Orientation(v));
        }
        if let Some(v) = t.validity {
            chunks.push(DataTrackerChunk::Status(v));
        }
        if let Some(v) = t.accel {
            chunks.push(DataTrackerChunk::Acceleration(v));
        }
        if let Some(v) = t.target_pos {
            chunks.push(DataTrackerChunk::TargetPosition(v));
        }
        if let Some(v) = t.timestamp {
            chunks.push(DataTrackerChunk::Timestamp(v));
        }
        Self::new(t.id, chunks)
    }

    /// Encoded size of the tracker chunk, header included.
    pub fn encoded_len(&self) -> usize {
        match &self.leaf {
            Some(raw) => CHUNK_HEADER_LEN + raw.len(),
            None => CHUNK_HEADER_LEN + self.chunks.iter().map(DataTrackerChunk::encoded_len).sum::<usize>(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataPacketChunk {
    FrameHeader(FrameHeader),
    TrackerList(Vec<DataTrackerNode>),
    Unknown(UnknownChunk),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataPacket {
    pub chunks: Vec<DataPacketChunk>,
}

impl DataPacket {
    pub fn new(header: FrameHeader, trackers: Vec<DataTrackerNode>) -> Self {
        Self {
            chunks: vec![DataPacketChunk::FrameHeader(header), DataPacketChunk::TrackerList(trackers)],
        }
    }

    pub fn frame_headers(&self) -> impl Iterator<Item = &FrameHeader> {
        self.chunks.iter().filter_map(|c| match c {
            DataPacketChunk::FrameHeader(h) => Some(h),
            _ => None,
        })
    }

    pub fn frame_headers_mut(&mut self) -> impl Iterator<Item = &mut FrameHeader> {
        self.chunks.iter_mut().filter_map(|c| match c {
            DataPacketChunk::FrameHeader(h) => Some(h),
            _ => None,
        })
    }

    pub fn tracker_lists(&self) -> impl Iterator<Item = &Vec<DataTrackerNode>> {
        self.chunks.iter().filter_map(|c| match c {
            DataPacketChunk::TrackerList(l) => Some(l),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Info packet vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoTrackerChunk {
    Name(String),
    Unknown(UnknownChunk),
}

impl InfoTrackerChunk {
    pub fn encoded_len(&self) -> usize {
        match self {
            InfoTrackerChunk::Name(n) => CHUNK_HEADER_LEN + n.len(),
            InfoTrackerChunk::Unknown(u) => u.encoded_len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoTrackerNode {
    pub id: u16,
    pub chunks: Vec<InfoTrackerChunk>,
    /// Same as `DataTrackerNode::leaf`.
    pub leaf: Option<Bytes>,
}

impl InfoTrackerNode {
    pub fn new(id: u16, chunks: Vec<InfoTrackerChunk>) -> Self {
        Self { id, chunks, leaf: None }
    }

    pub fn from_tracker(t: &Tracker) -> Self {
        Self::new(t.id, t.name.iter().map(|n| InfoTrackerChunk::Name(n.clone())).collect())
    }

    pub fn encoded_len(&self) -> usize {
        match &self.leaf {
            Some(raw) => CHUNK_HEADER_LEN + raw.len(),
            None => CHUNK_HEADER_LEN + self.chunks.iter().map(InfoTrackerChunk::encoded_len).sum::<usize>(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoPacketChunk {
    FrameHeader(FrameHeader),
    SystemName(String),
    TrackerList(Vec<InfoTrackerNode>),
    Unknown(UnknownChunk),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoPacket {
    pub chunks: Vec<InfoPacketChunk>,
}

impl InfoPacket {
    pub fn new(header: FrameHeader, system_name: impl Into<String>, trackers: Vec<InfoTrackerNode>) -> Self {
        Self {
            chunks: vec![
                InfoPacketChunk::FrameHeader(header),
                InfoPacketChunk::SystemName(system_name.into()),
                InfoPacketChunk::TrackerList(trackers),
            ],
        }
    }

    pub fn frame_headers(&self) -> impl Iterator<Item = &FrameHeader> {
        self.chunks.iter().filter_map(|c| match c {
            InfoPacketChunk::FrameHeader(h) => Some(h),
            _ => None,
        })
    }

    pub fn frame_headers_mut(&mut self) -> impl Iterator<Item = &mut FrameHeader> {
        self.chunks.iter_mut().filter_map(|c| match c {
            InfoPacketChunk::FrameHeader(h) => Some(h),
            _ => None,
        })
    }

    pub fn system_names(&self) -> impl Iterator<Item = &String> {
        self.chunks.iter().filter_map(|c| match c {
            InfoPacketChunk::SystemName(n) => Some(n),
            _ => None,
        })
    }

    pub fn tracker_lists(&self) -> impl Iterator<Item = &Vec<InfoTrackerNode>> {
        self.chunks.iter().filter_map(|c| match c {
            InfoPacketChunk::TrackerList(l) => Some(l),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Data(DataPacket),
    Info(InfoPacket),
    Unknown(UnknownChunk),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Data(_) => PacketKind::Data,
            Packet::Info(_) => PacketKind::Info,
            Packet::Unknown(u) => PacketKind::Unknown(u.chunk_id),
        }
    }
}

bitflags::bitflags! {
    /// Facts noticed while decoding that do not fail the packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DecodeFlags: u8 {
        /// At least one chunk id was outside its container's vocabulary.
        const UNKNOWN_CHUNKS = 0b0000_0001;

        /// Bytes followed the root chunk in the datagram and were ignored.
        const TRAILING_BYTES = 0b0000_0010;
    }
}

/// Result of decoding one datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    pub packet: Packet,
    pub flags: DecodeFlags,
}

impl DecodedPacket {
    pub fn contains_unknown_chunks(&self) -> bool {
        self.flags.contains(DecodeFlags::UNKNOWN_CHUNKS)
    }
}
