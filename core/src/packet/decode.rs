//! Typed packet decoding.
//!
//! Each container level owns a small id → decoder table. An id missing from
//! the table becomes `Unknown` with its raw bytes and raises
//! `DecodeFlags::UNKNOWN_CHUNKS`; it never fails the packet. Any structural
//! error (overrun, stray bytes, wrong fixed width) fails the whole packet.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::chunk::{ChunkError, ChunkReader, RawChunk};
use crate::constants::{
    data_packet, data_tracker, info_packet, info_tracker, FLOAT3_PAYLOAD_LEN, STATUS_PAYLOAD_LEN,
    TIMESTAMP_PAYLOAD_LEN,
};
use crate::headers::{ChunkHeader, HeaderError};
use crate::packet::types::{
    DataPacket, DataPacketChunk, DataTrackerChunk, DataTrackerNode, DecodeFlags, DecodedPacket,
    FrameHeader, InfoPacket, InfoPacketChunk, InfoTrackerChunk, InfoTrackerNode, Packet, PacketKind,
    UnknownChunk,
};
use crate::tracker::Float3;

type ChunkDecoder<T> = fn(&RawChunk<'_>, &mut DecodeFlags) -> Result<T, ChunkError>;

/// One row of a container's dispatch table.
struct Entry<T> {
    id: u16,
    decode: ChunkDecoder<T>,
}

const DATA_PACKET_TABLE: &[Entry<DataPacketChunk>] = &[
    Entry {
        id: data_packet::FRAME_HEADER,
        decode: |raw, _| Ok(DataPacketChunk::FrameHeader(frame_header(raw)?)),
    },
    Entry {
        id: data_packet::TRACKER_LIST,
        decode: |raw, flags| Ok(DataPacketChunk::TrackerList(data_tracker_list(raw, flags)?)),
    },
];

const INFO_PACKET_TABLE: &[Entry<InfoPacketChunk>] = &[
    Entry {
        id: info_packet::FRAME_HEADER,
        decode: |raw, _| Ok(InfoPacketChunk::FrameHeader(frame_header(raw)?)),
    },
    Entry {
        id: info_packet::SYSTEM_NAME,
        decode: |raw, _| Ok(InfoPacketChunk::SystemName(string(raw)?)),
    },
    Entry {
        id: info_packet::TRACKER_LIST,
        decode: |raw, flags| Ok(InfoPacketChunk::TrackerList(info_tracker_list(raw, flags)?)),
    },
];

const DATA_TRACKER_TABLE: &[Entry<DataTrackerChunk>] = &[
    Entry {
        id: data_tracker::POSITION,
        decode: |raw, _| Ok(DataTrackerChunk::Position(float3(raw)?)),
    },
    Entry {
        id: data_tracker::SPEED,
        decode: |raw, _| Ok(DataTrackerChunk::Speed(float3(raw)?)),
    },
    Entry {
        id: data_tracker::ORIENTATION,
        decode: |raw, _| Ok(DataTrackerChunk::Orientation(float3(raw)?)),
    },
    Entry {
        id: data_tracker::STATUS,
        decode: |raw, _| Ok(DataTrackerChunk::Status(status(raw)?)),
    },
    Entry {
        id: data_tracker::ACCELERATION,
        decode: |raw, _| Ok(DataTrackerChunk::Acceleration(float3(raw)?)),
    },
    Entry {
        id: data_tracker::TARGET_POSITION,
        decode: |raw, _| Ok(DataTrackerChunk::TargetPosition(float3(raw)?)),
    },
    Entry {
        id: data_tracker::TIMESTAMP,
        decode: |raw, _| Ok(DataTrackerChunk::Timestamp(timestamp(raw)?)),
    },
];

const INFO_TRACKER_TABLE: &[Entry<InfoTrackerChunk>] = &[
    Entry {
        id: info_tracker::NAME,
        decode: |raw, _| Ok(InfoTrackerChunk::Name(string(raw)?)),
    },
];

/// Decode one datagram.
///
/// Only the first root chunk is read; bytes after it are ignored and flagged
/// with `DecodeFlags::TRAILING_BYTES`.
pub fn decode_packet(buf: &[u8]) -> Result<DecodedPacket, ChunkError> {
    let mut reader = ChunkReader::new(buf);
    let root = reader
        .next_chunk()?
        .ok_or(ChunkError::Header(HeaderError::BufferTooShort { have: 0, need: ChunkHeader::LEN }))?;

    let mut flags = DecodeFlags::empty();
    if reader.remaining() > 0 {
        flags |= DecodeFlags::TRAILING_BYTES;
    }

    let packet = match PacketKind::from_root_id(root.id()) {
        PacketKind::Data => {
            expect_container(&root)?;
            Packet::Data(DataPacket {
                chunks: decode_children(&root, DATA_PACKET_TABLE, DataPacketChunk::Unknown, &mut flags)?,
            })
        }
        PacketKind::Info => {
            expect_container(&root)?;
            Packet::Info(InfoPacket {
                chunks: decode_children(&root, INFO_PACKET_TABLE, InfoPacketChunk::Unknown, &mut flags)?,
            })
        }
        PacketKind::Unknown(_) => {
            flags |= DecodeFlags::UNKNOWN_CHUNKS;
            Packet::Unknown(unknown(&root))
        }
    };

    Ok(DecodedPacket { packet, flags })
}

/// Frame header payload in wire order.
pub fn parse_frame_header_payload(payload: &[u8; FrameHeader::LEN]) -> FrameHeader {
    FrameHeader {
        timestamp: LittleEndian::read_u64(&payload[0..8]),
        version_high: payload[8],
        version_low: payload[9],
        frame_id: payload[10],
        frame_packet_count: payload[11],
    }
}

fn decode_children<T>(
    parent: &RawChunk<'_>,
    table: &[Entry<T>],
    on_unknown: fn(UnknownChunk) -> T,
    flags: &mut DecodeFlags,
) -> Result<Vec<T>, ChunkError> {
    let mut out = Vec::new();
    for child in parent.children() {
        let child = child?;
        match table.iter().find(|e| e.id == child.id()) {
            Some(entry) => out.push((entry.decode)(&child, flags)?),
            None => {
                *flags |= DecodeFlags::UNKNOWN_CHUNKS;
                out.push(on_unknown(unknown(&child)));
            }
        }
    }
    Ok(out)
}

fn data_tracker_list(raw: &RawChunk<'_>, flags: &mut DecodeFlags) -> Result<Vec<DataTrackerNode>, ChunkError> {
    expect_container(raw)?;
    let mut trackers = Vec::new();
    for child in raw.children() {
        let child = child?;
        let node = if child.header.has_children {
            let chunks = decode_children(&child, DATA_TRACKER_TABLE, DataTrackerChunk::Unknown, flags)?;
            DataTrackerNode::new(child.id(), chunks)
        } else {
            let leaf = Some(leaf_tracker_body(&child, flags));
            DataTrackerNode { id: child.id(), chunks: Vec::new(), leaf }
        };
        trackers.push(node);
    }
    Ok(trackers)
}

fn info_tracker_list(raw: &RawChunk<'_>, flags: &mut DecodeFlags) -> Result<Vec<InfoTrackerNode>, ChunkError> {
    expect_container(raw)?;
    let mut trackers = Vec::new();
    for child in raw.children() {
        let child = child?;
        let node = if child.header.has_children {
            let chunks = decode_children(&child, INFO_TRACKER_TABLE, InfoTrackerChunk::Unknown, flags)?;
            InfoTrackerNode::new(child.id(), chunks)
        } else {
            let leaf = Some(leaf_tracker_body(&child, flags));
            InfoTrackerNode { id: child.id(), chunks: Vec::new(), leaf }
        };
        trackers.push(node);
    }
    Ok(trackers)
}

/// A tracker sent as a leaf has no field chunks. An empty leaf is a tracker
/// with nothing to say; a non-empty one is opaque content.
fn leaf_tracker_body(raw: &RawChunk<'_>, flags: &mut DecodeFlags) -> Bytes {
    if !raw.data.is_empty() {
        *flags |= DecodeFlags::UNKNOWN_CHUNKS;
    }
    Bytes::copy_from_slice(raw.data)
}

fn expect_container(raw: &RawChunk<'_>) -> Result<(), ChunkError> {
    if !raw.header.has_children {
        return Err(ChunkError::UnexpectedShape { chunk_id: raw.id(), has_children: false });
    }
    Ok(())
}

fn unknown(raw: &RawChunk<'_>) -> UnknownChunk {
    UnknownChunk {
        chunk_id: raw.id(),
        has_children: raw.header.has_children,
        raw: Bytes::copy_from_slice(raw.data),
    }
}

fn frame_header(raw: &RawChunk<'_>) -> Result<FrameHeader, ChunkError> {
    let payload = raw.fixed_payload(FrameHeader::LEN)?;
    let mut fixed = [0u8; FrameHeader::LEN];
    fixed.copy_from_slice(payload);
    Ok(parse_frame_header_payload(&fixed))
}

fn float3(raw: &RawChunk<'_>) -> Result<Float3, ChunkError> {
    let p = raw.fixed_payload(FLOAT3_PAYLOAD_LEN)?;
    Ok(Float3::new(
        LittleEndian::read_f32(&p[0..4]),
        LittleEndian::read_f32(&p[4..8]),
        LittleEndian::read_f32(&p[8..12]),
    ))
}

fn status(raw: &RawChunk<'_>) -> Result<f32, ChunkError> {
    Ok(LittleEndian::read_f32(raw.fixed_payload(STATUS_PAYLOAD_LEN)?))
}

fn timestamp(raw: &RawChunk<'_>) -> Result<u64, ChunkError> {
    Ok(LittleEndian::read_u64(raw.fixed_payload(TIMESTAMP_PAYLOAD_LEN)?))
}

// Invalid UTF-8 is replaced rather than failing the packet.
fn string(raw: &RawChunk<'_>) -> Result<String, ChunkError> {
    if raw.header.has_children {
        return Err(ChunkError::UnexpectedShape { chunk_id: raw.id(), has_children: true });
    }
    Ok(String::from_utf8_lossy(raw.data).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{encode_tree, ChunkNode};

    fn frame_header_leaf() -> ChunkNode {
        let h = FrameHeader::new(1000, 5, 1);
        ChunkNode::leaf(0, crate::packet::encode::frame_header_payload(&h).to_vec())
    }

    #[test]
    fn same_small_id_means_different_things_per_container() {
        // 0x0001 is the tracker list under a data root and the system name under an info root
        let data = ChunkNode::container(0x6755, vec![frame_header_leaf(), ChunkNode::container(1, vec![])]);
        let info = ChunkNode::container(0x6756, vec![frame_header_leaf(), ChunkNode::leaf(1, b"rig".to_vec())]);

        match decode_packet(&encode_tree(&data).unwrap()).unwrap().packet {
            Packet::Data(p) => assert!(matches!(p.chunks[1], DataPacketChunk::TrackerList(ref l) if l.is_empty())),
            other => panic!("unexpected {:?}", other),
        }
        match decode_packet(&encode_tree(&info).unwrap()).unwrap().packet {
            Packet::Info(p) => assert_eq!(p.chunks[1], InfoPacketChunk::SystemName("rig".into())),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_tracker_field_is_kept_and_flagged() {
        let tracker = ChunkNode::container(
            42,
            vec![ChunkNode::leaf(0, vec![0u8; 12]), ChunkNode::leaf(0x0099, vec![7, 7, 7])],
        );
        let data = ChunkNode::container(0x6755, vec![frame_header_leaf(), ChunkNode::container(1, vec![tracker])]);

        let decoded = decode_packet(&encode_tree(&data).unwrap()).unwrap();
        assert!(decoded.contains_unknown_chunks());
        let Packet::Data(p) = decoded.packet else { panic!("expected data packet") };
        let list = p.tracker_lists().next().unwrap();
        assert_eq!(list[0].id, 42);
        assert_eq!(
            list[0].chunks[1],
            DataTrackerChunk::Unknown(UnknownChunk { chunk_id: 0x99, has_children: false, raw: Bytes::from_static(&[7, 7, 7]) })
        );
    }

    #[test]
    fn wrong_width_field_fails_whole_packet() {
        let tracker = ChunkNode::container(1, vec![ChunkNode::leaf(0, vec![0u8; 8])]);
        let data = ChunkNode::container(0x6755, vec![frame_header_leaf(), ChunkNode::container(1, vec![tracker])]);
        assert!(matches!(
            decode_packet(&encode_tree(&data).unwrap()),
            Err(ChunkError::PayloadLength { chunk_id: 0, expected: 12, actual: 8 })
        ));
    }

    #[test]
    fn unknown_root_is_reported_not_failed() {
        let legacy = ChunkNode::container(0x6754, vec![ChunkNode::leaf(0, vec![1, 2, 3])]);
        let decoded = decode_packet(&encode_tree(&legacy).unwrap()).unwrap();
        assert_eq!(decoded.packet.kind(), PacketKind::Unknown(0x6754));
        assert!(decoded.contains_unknown_chunks());
    }

    #[test]
    fn trailing_bytes_are_flagged() {
        let data = ChunkNode::container(0x6755, vec![frame_header_leaf(), ChunkNode::container(1, vec![])]);
        let mut wire = encode_tree(&data).unwrap();
        wire.extend_from_slice(&[0, 0]);
        let decoded = decode_packet(&wire).unwrap();
        assert!(decoded.flags.contains(DecodeFlags::TRAILING_BYTES));
    }

    #[test]
    fn empty_datagram_fails() {
        assert!(decode_packet(&[]).is_err());
        assert!(decode_packet(&[0x55, 0x67]).is_err());
    }
}
