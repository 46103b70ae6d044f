use std::sync::Arc;

use thiserror::Error;

use crate::packet::{
    DataPacket, DataPacketChunk, DataTrackerNode, FrameHeader, InfoPacket, InfoPacketChunk,
    InfoTrackerNode, PacketKind,
};
use crate::store::TrackerMap;

/// Why a single packet was refused before touching any frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("no frame header chunk")]
    MissingFrameHeader,

    #[error("{count} frame header chunks")]
    DuplicateFrameHeader { count: usize },

    #[error("no tracker list chunk")]
    MissingTrackerList,

    #[error("{count} tracker list chunks")]
    DuplicateTrackerList { count: usize },

    #[error("{count} system name chunks")]
    DuplicateSystemName { count: usize },

    #[error("frame header declares zero packets")]
    ZeroPacketCount,
}

/// One structurally valid packet, reduced to what reassembly needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePart<T> {
    pub header: FrameHeader,
    pub trackers: Vec<T>,
    pub system_name: Option<String>,
}

fn exactly_one<I: Iterator>(mut it: I, missing: RejectReason, dup: fn(usize) -> RejectReason) -> Result<I::Item, RejectReason> {
    let first = it.next().ok_or(missing)?;
    let extra = it.count();
    if extra > 0 {
        return Err(dup(extra + 1));
    }
    Ok(first)
}

fn checked_header(header: FrameHeader) -> Result<FrameHeader, RejectReason> {
    if header.frame_packet_count == 0 {
        return Err(RejectReason::ZeroPacketCount);
    }
    Ok(header)
}

impl FramePart<DataTrackerNode> {
    /// Exactly one frame header and exactly one tracker list.
    pub fn from_data(packet: DataPacket) -> Result<Self, RejectReason> {
        let header = *exactly_one(packet.frame_headers(), RejectReason::MissingFrameHeader, |count| {
            RejectReason::DuplicateFrameHeader { count }
        })?;
        exactly_one(packet.tracker_lists(), RejectReason::MissingTrackerList, |count| {
            RejectReason::DuplicateTrackerList { count }
        })?;
        let header = checked_header(header)?;

        let trackers = packet
            .chunks
            .into_iter()
            .find_map(|c| match c {
                DataPacketChunk::TrackerList(list) => Some(list),
                _ => None,
            })
            .unwrap_or_default();
        Ok(Self { header, trackers, system_name: None })
    }
}

impl FramePart<InfoTrackerNode> {
    /// Exactly one frame header, exactly one tracker list, at most one system name.
    pub fn from_info(packet: InfoPacket) -> Result<Self, RejectReason> {
        let header = *exactly_one(packet.frame_headers(), RejectReason::MissingFrameHeader, |count| {
            RejectReason::DuplicateFrameHeader { count }
        })?;
        exactly_one(packet.tracker_lists(), RejectReason::MissingTrackerList, |count| {
            RejectReason::DuplicateTrackerList { count }
        })?;
        let names = packet.system_names().count();
        if names > 1 {
            return Err(RejectReason::DuplicateSystemName { count: names });
        }
        let header = checked_header(header)?;

        let mut trackers = Vec::new();
        let mut system_name = None;
        for chunk in packet.chunks {
            match chunk {
                InfoPacketChunk::TrackerList(list) => trackers = list,
                InfoPacketChunk::SystemName(name) => system_name = Some(name),
                _ => {}
            }
        }
        Ok(Self { header, trackers, system_name })
    }
}

/// Notifications produced by the receive pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ReassemblyEvent {
    /// A packet failed the per-packet structure check.
    PacketRejected { kind: PacketKind, reason: RejectReason },

    /// A partially collected frame was dropped because a packet from another
    /// frame arrived first.
    IncompleteFrameDiscarded {
        kind: PacketKind,
        frame_id: u8,
        timestamp: u64,
        received: usize,
        expected: u8,
    },

    /// A completed frame carried the same tracker id twice; nothing applied.
    DuplicateTrackerId { kind: PacketKind, frame_id: u8, tracker_id: u16 },

    /// A frame completed and was applied.
    Update {
        kind: PacketKind,
        frame_id: u8,
        timestamp: u64,
        system_name: Option<String>,
        trackers: Arc<TrackerMap>,
    },
}

impl ReassemblyEvent {
    pub fn kind(&self) -> PacketKind {
        match self {
            ReassemblyEvent::PacketRejected { kind, .. }
            | ReassemblyEvent::IncompleteFrameDiscarded { kind, .. }
            | ReassemblyEvent::DuplicateTrackerId { kind, .. }
            | ReassemblyEvent::Update { kind, .. } => *kind,
        }
    }

    pub fn is_update(&self) -> bool {
        matches!(self, ReassemblyEvent::Update { .. })
    }
}
