//! fragment.rs
//! Send-side partitioning of a tracker set into MTU-sized packets.
//!
//! Design notes:
//! - Strict first-fit in input order. No reordering, no backtracking.
//! - `frame_packet_count` is only known once partitioning is done, so it is
//!   stamped onto every packet afterwards.
//! - A tracker that cannot fit an otherwise empty packet is a configuration
//!   error; it is never emitted oversized and never dropped.

use std::collections::HashSet;

use thiserror::Error;

use crate::chunk::ChunkError;
use crate::constants::{CHUNK_HEADER_LEN, MAX_PACKET_LEN};
use crate::packet::{
    encode_data_packet, encode_info_packet, DataPacket, DataTrackerNode, FrameHeader, InfoPacket,
    InfoTrackerNode,
};
use crate::tracker::Tracker;

/// Frame identity shared by every packet of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    pub timestamp: u64,
    pub version_high: u8,
    pub version_low: u8,
    pub frame_id: u8,
}

impl FrameMeta {
    pub fn new(timestamp: u64, frame_id: u8) -> Self {
        let h = FrameHeader::new(timestamp, frame_id, 0);
        Self { timestamp, version_high: h.version_high, version_low: h.version_low, frame_id }
    }

    fn header(&self, frame_packet_count: u8) -> FrameHeader {
        FrameHeader {
            timestamp: self.timestamp,
            version_high: self.version_high,
            version_low: self.version_low,
            frame_id: self.frame_id,
            frame_packet_count,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FragmentError {
    #[error("tracker {tracker_id} encodes to {len} bytes, only {budget} available per packet")]
    TrackerTooLarge { tracker_id: u16, len: usize, budget: usize },

    #[error("packet overhead {overhead} leaves no room under {max_packet_len} bytes")]
    OverheadTooLarge { overhead: usize, max_packet_len: usize },

    #[error("frame needs {count} packets, at most 255 fit the frame header")]
    TooManyPackets { count: usize },

    #[error("tracker id {0} appears more than once in the frame")]
    DuplicateTrackerId(u16),

    #[error("encoded packet is {len} bytes, limit is {max}")]
    PacketTooLarge { len: usize, max: usize },

    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

const FRAME_HEADER_CHUNK_LEN: usize = CHUNK_HEADER_LEN + FrameHeader::LEN;

/// Fixed bytes in every data packet: root + frame header chunk + tracker list header.
pub const DATA_PACKET_OVERHEAD: usize = CHUNK_HEADER_LEN + FRAME_HEADER_CHUNK_LEN + CHUNK_HEADER_LEN;

/// Fixed bytes in every info packet for a given system name.
pub fn info_packet_overhead(system_name: &str) -> usize {
    CHUNK_HEADER_LEN + FRAME_HEADER_CHUNK_LEN + CHUNK_HEADER_LEN + system_name.len() + CHUNK_HEADER_LEN
}

/// Partition trackers into data packets.
pub fn fragment_data_frame(
    trackers: &[Tracker],
    meta: &FrameMeta,
    max_packet_len: usize,
) -> Result<Vec<DataPacket>, FragmentError> {
    let nodes = trackers.iter().map(DataTrackerNode::from_tracker).collect();
    let groups = first_fit(nodes, DATA_PACKET_OVERHEAD, max_packet_len, |n| n.id, DataTrackerNode::encoded_len)?;
    let count = packet_count(groups.len())?;
    Ok(groups
        .into_iter()
        .map(|group| DataPacket::new(meta.header(count), group))
        .collect())
}

/// Partition trackers into info packets, each carrying the system name.
pub fn fragment_info_frame(
    trackers: &[Tracker],
    system_name: &str,
    meta: &FrameMeta,
    max_packet_len: usize,
) -> Result<Vec<InfoPacket>, FragmentError> {
    let nodes = trackers.iter().map(InfoTrackerNode::from_tracker).collect();
    let overhead = info_packet_overhead(system_name);
    let groups = first_fit(nodes, overhead, max_packet_len, |n| n.id, InfoTrackerNode::encoded_len)?;
    let count = packet_count(groups.len())?;
    Ok(groups
        .into_iter()
        .map(|group| InfoPacket::new(meta.header(count), system_name, group))
        .collect())
}

/// Fragment and serialize one data frame.
pub fn encode_data_frame(
    trackers: &[Tracker],
    meta: &FrameMeta,
    max_packet_len: usize,
) -> Result<Vec<Vec<u8>>, FragmentError> {
    let max = max_packet_len.min(MAX_PACKET_LEN);
    fragment_data_frame(trackers, meta, max)?
        .iter()
        .map(|p| checked(encode_data_packet(p)?, max))
        .collect()
}

/// Fragment and serialize one info frame.
pub fn encode_info_frame(
    trackers: &[Tracker],
    system_name: &str,
    meta: &FrameMeta,
    max_packet_len: usize,
) -> Result<Vec<Vec<u8>>, FragmentError> {
    let max = max_packet_len.min(MAX_PACKET_LEN);
    fragment_info_frame(trackers, system_name, meta, max)?
        .iter()
        .map(|p| checked(encode_info_packet(p)?, max))
        .collect()
}

fn checked(bytes: Vec<u8>, max: usize) -> Result<Vec<u8>, FragmentError> {
    if bytes.len() > max {
        return Err(FragmentError::PacketTooLarge { len: bytes.len(), max });
    }
    Ok(bytes)
}

fn packet_count(groups: usize) -> Result<u8, FragmentError> {
    u8::try_from(groups).map_err(|_| FragmentError::TooManyPackets { count: groups })
}

/// Strict first-fit. An empty input still yields one (empty) group so the
/// frame is announced.
fn first_fit<T>(
    nodes: Vec<T>,
    overhead: usize,
    max_packet_len: usize,
    id_of: impl Fn(&T) -> u16,
    len_of: impl Fn(&T) -> usize,
) -> Result<Vec<Vec<T>>, FragmentError> {
    let max_packet_len = max_packet_len.min(MAX_PACKET_LEN);
    if overhead >= max_packet_len {
        return Err(FragmentError::OverheadTooLarge { overhead, max_packet_len });
    }
    let budget = max_packet_len - overhead;

    let mut seen = HashSet::with_capacity(nodes.len());
    let mut groups: Vec<Vec<T>> = Vec::new();
    let mut current: Vec<T> = Vec::new();
    let mut used = 0usize;

    for node in nodes {
        let id = id_of(&node);
        if !seen.insert(id) {
            return Err(FragmentError::DuplicateTrackerId(id));
        }
        let len = len_of(&node);
        if len > budget {
            return Err(FragmentError::TrackerTooLarge { tracker_id: id, len, budget });
        }
        if used + len > budget {
            groups.push(std::mem::take(&mut current));
            used = 0;
        }
        used += len;
        current.push(node);
    }

    if !current.is_empty() || groups.is_empty() {
        groups.push(current);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Float3;

    fn full_tracker(id: u16) -> Tracker {
        Tracker::new(id)
            .with_pos(Float3::new(1.0, 2.0, 3.0))
            .with_speed(Float3::ZERO)
            .with_ori(Float3::ZERO)
            .with_validity(1.0)
            .with_accel(Float3::ZERO)
            .with_target_pos(Float3::ZERO)
            .with_timestamp(9)
    }

    #[test]
    fn full_tracker_chunk_size() {
        // 4 header + 6 * (4 + 12) + (4 + 4) + (4 + 8)
        assert_eq!(DataTrackerNode::from_tracker(&full_tracker(1)).encoded_len(), 4 + 96 + 8 + 12);
    }

    #[test]
    fn first_fit_closes_packet_when_next_tracker_overflows() {
        // 120 bytes per tracker, budget 1500 - 24 = 1476 → 12 per packet
        let trackers: Vec<_> = (0..30).map(full_tracker).collect();
        let packets = fragment_data_frame(&trackers, &FrameMeta::new(1, 0), MAX_PACKET_LEN).unwrap();

        let sizes: Vec<_> = packets.iter().map(|p| p.tracker_lists().next().unwrap().len()).collect();
        assert_eq!(sizes, vec![12, 12, 6]);
        for p in &packets {
            assert_eq!(p.frame_headers().next().unwrap().frame_packet_count, 3);
        }
    }

    #[test]
    fn input_order_is_preserved() {
        let trackers: Vec<_> = [5u16, 1, 9, 3].iter().map(|&i| full_tracker(i)).collect();
        let packets = fragment_data_frame(&trackers, &FrameMeta::new(1, 0), 300).unwrap();
        let ids: Vec<u16> = packets
            .iter()
            .flat_map(|p| p.tracker_lists().next().unwrap().iter().map(|t| t.id).collect::<Vec<_>>())
            .collect();
        assert_eq!(ids, vec![5, 1, 9, 3]);
    }

    #[test]
    fn empty_set_still_announces_frame() {
        let packets = fragment_data_frame(&[], &FrameMeta::new(1, 0), MAX_PACKET_LEN).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(packets[0].tracker_lists().next().unwrap().is_empty());
    }

    #[test]
    fn tracker_larger_than_budget_is_rejected() {
        let name = "x".repeat(1500);
        let err = fragment_info_frame(&[Tracker::new(2).with_name(name)], "sys", &FrameMeta::new(1, 0), MAX_PACKET_LEN)
            .unwrap_err();
        assert!(matches!(err, FragmentError::TrackerTooLarge { tracker_id: 2, .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected_on_send() {
        let err = fragment_data_frame(&[full_tracker(1), full_tracker(1)], &FrameMeta::new(1, 0), MAX_PACKET_LEN)
            .unwrap_err();
        assert_eq!(err, FragmentError::DuplicateTrackerId(1));
    }

    #[test]
    fn system_name_that_fills_the_packet_is_rejected() {
        let err = fragment_info_frame(&[], &"n".repeat(1480), &FrameMeta::new(1, 0), MAX_PACKET_LEN).unwrap_err();
        assert!(matches!(err, FragmentError::OverheadTooLarge { .. }));
    }

    #[test]
    fn more_than_255_packets_is_rejected() {
        let trackers: Vec<_> = (0..300).map(full_tracker).collect();
        // 24 overhead + one 120-byte tracker per packet
        let err = fragment_data_frame(&trackers, &FrameMeta::new(1, 0), 150).unwrap_err();
        assert_eq!(err, FragmentError::TooManyPackets { count: 300 });
    }

    #[test]
    fn encoded_packets_match_predicted_sizes() {
        let trackers: Vec<_> = (0..20).map(full_tracker).collect();
        let wire = encode_data_frame(&trackers, &FrameMeta::new(7, 3), MAX_PACKET_LEN).unwrap();
        assert_eq!(wire[0].len(), DATA_PACKET_OVERHEAD + 12 * 120);
        assert!(wire.iter().all(|w| w.len() <= MAX_PACKET_LEN));
    }
}
