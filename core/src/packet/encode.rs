use byteorder::{ByteOrder, LittleEndian};

use crate::chunk::{ChunkError, ChunkWriter};
use crate::constants::{data_packet, data_tracker, info_packet, info_tracker};
use crate::packet::types::{
    DataPacket, DataPacketChunk, DataTrackerChunk, FrameHeader, InfoPacket, InfoPacketChunk,
    InfoTrackerChunk, Packet, PacketKind, UnknownChunk,
};
use crate::tracker::Float3;

/// Encode a packet into one datagram.
///
/// Layout:
///
/// ```text
/// [ root header (4) ]
///   [ frame header chunk (4 + 12) ]
///   [ system name chunk (4 + N) ]      info only
///   [ tracker list header (4) ]
///     [ tracker header (4) ] [ field chunks ... ]
///     ...
/// ```
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, ChunkError> {
    match packet {
        Packet::Data(p) => encode_data_packet(p),
        Packet::Info(p) => encode_info_packet(p),
        Packet::Unknown(u) => {
            let mut w = ChunkWriter::with_capacity(u.encoded_len());
            write_unknown(&mut w, u)?;
            w.finish()
        }
    }
}

pub fn encode_data_packet(packet: &DataPacket) -> Result<Vec<u8>, ChunkError> {
    let mut w = ChunkWriter::with_capacity(crate::constants::MAX_PACKET_LEN);
    w.container(PacketKind::Data.root_id(), |w| {
        for chunk in &packet.chunks {
            match chunk {
                DataPacketChunk::FrameHeader(h) => write_frame_header(w, data_packet::FRAME_HEADER, h)?,
                DataPacketChunk::TrackerList(trackers) => w.container(data_packet::TRACKER_LIST, |w| {
                    for t in trackers {
                        match &t.leaf {
                            Some(raw) => w.opaque(t.id, false, raw)?,
                            None => w.container(t.id, |w| {
                                t.chunks.iter().try_for_each(|c| write_data_tracker_chunk(w, c))
                            })?,
                        }
                    }
                    Ok(())
                })?,
                DataPacketChunk::Unknown(u) => write_unknown(w, u)?,
            }
        }
        Ok(())
    })?;
    w.finish()
}

pub fn encode_info_packet(packet: &InfoPacket) -> Result<Vec<u8>, ChunkError> {
    let mut w = ChunkWriter::with_capacity(crate::constants::MAX_PACKET_LEN);
    w.container(PacketKind::Info.root_id(), |w| {
        for chunk in &packet.chunks {
            match chunk {
                InfoPacketChunk::FrameHeader(h) => write_frame_header(w, info_packet::FRAME_HEADER, h)?,
                InfoPacketChunk::SystemName(name) => w.leaf(info_packet::SYSTEM_NAME, name.as_bytes())?,
                InfoPacketChunk::TrackerList(trackers) => w.container(info_packet::TRACKER_LIST, |w| {
                    for t in trackers {
                        match &t.leaf {
                            Some(raw) => w.opaque(t.id, false, raw)?,
                            None => w.container(t.id, |w| {
                                t.chunks.iter().try_for_each(|c| match c {
                                    InfoTrackerChunk::Name(n) => w.leaf(info_tracker::NAME, n.as_bytes()),
                                    InfoTrackerChunk::Unknown(u) => write_unknown(w, u),
                                })
                            })?,
                        }
                    }
                    Ok(())
                })?,
                InfoPacketChunk::Unknown(u) => write_unknown(w, u)?,
            }
        }
        Ok(())
    })?;
    w.finish()
}

/// Frame header payload in wire order.
pub fn frame_header_payload(h: &FrameHeader) -> [u8; FrameHeader::LEN] {
    let mut out = [0u8; FrameHeader::LEN];
    LittleEndian::write_u64(&mut out[0..8], h.timestamp);
    out[8] = h.version_high;
    out[9] = h.version_low;
    out[10] = h.frame_id;
    out[11] = h.frame_packet_count;
    out
}

fn write_frame_header(w: &mut ChunkWriter, id: u16, h: &FrameHeader) -> Result<(), ChunkError> {
    w.leaf(id, &frame_header_payload(h))
}

fn float3_payload(v: &Float3) -> [u8; 12] {
    let mut out = [0u8; 12];
    LittleEndian::write_f32(&mut out[0..4], v.x);
    LittleEndian::write_f32(&mut out[4..8], v.y);
    LittleEndian::write_f32(&mut out[8..12], v.z);
    out
}

fn write_data_tracker_chunk(w: &mut ChunkWriter, chunk: &DataTrackerChunk) -> Result<(), ChunkError> {
    use DataTrackerChunk::*;
    match chunk {
        Position(v) => w.leaf(data_tracker::POSITION, &float3_payload(v)),
        Speed(v) => w.leaf(data_tracker::SPEED, &float3_payload(v)),
        Orientation(v) => w.leaf(data_tracker::ORIENTATION, &float3_payload(v)),
        Status(validity) => w.leaf(data_tracker::STATUS, &validity.to_le_bytes()),
        Acceleration(v) => w.leaf(data_tracker::ACCELERATION, &float3_payload(v)),
        TargetPosition(v) => w.leaf(data_tracker::TARGET_POSITION, &float3_payload(v)),
        Timestamp(ts) => w.leaf(data_tracker::TIMESTAMP, &ts.to_le_bytes()),
        Unknown(u) => write_unknown(w, u),
    }
}

fn write_unknown(w: &mut ChunkWriter, u: &UnknownChunk) -> Result<(), ChunkError> {
    w.opaque(u.chunk_id, u.has_children, &u.raw)
}
