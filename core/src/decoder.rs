//! decoder.rs
//! Receive engine: datagrams in, notifications out.
//!
//! Design notes:
//! - Single owner. One `Decoder` holds both per-kind assemblers and the
//!   tracker store, so no locking happens on the receive path.
//! - Undecodable bytes are dropped here with a debug log and never reach the
//!   assemblers. Unknown roots are dropped the same way.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace, warn};

use crate::packet::{decode_packet, DataTrackerNode, InfoTrackerNode, Packet, PacketKind};
use crate::reassembly::{FrameAssembler, FramePart, ReassemblyEvent, RejectReason};
use crate::store::{TrackerMap, TrackerStore};
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::tracker::Tracker;

#[derive(Debug)]
pub struct Decoder {
    data: FrameAssembler<DataTrackerNode>,
    info: FrameAssembler<InfoTrackerNode>,
    store: TrackerStore,
    system_name: Option<String>,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            data: FrameAssembler::new(PacketKind::Data),
            info: FrameAssembler::new(PacketKind::Info),
            store: TrackerStore::new(),
            system_name: None,
            counters: TelemetryCounters::default(),
            timer: TelemetryTimer::new(),
        }
    }

    /// Feed one received datagram.
    ///
    /// # Returns
    /// Every notification the datagram caused, in order. Empty when the bytes
    /// were undecodable or only advanced a frame in progress.
    pub fn on_received(&mut self, bytes: &[u8]) -> Vec<ReassemblyEvent> {
        self.counters.add_received(bytes.len());
        trace!("[DECODER] datagram of {} bytes", bytes.len());

        let decoded = match self.timer.time(Stage::Decode, || decode_packet(bytes)) {
            Ok(d) => d,
            Err(e) => {
                self.counters.decode_failures += 1;
                debug!(
                    "[DECODER] dropped {} bytes [{}]: {e}",
                    bytes.len(),
                    hex::encode(&bytes[..bytes.len().min(16)])
                );
                return Vec::new();
            }
        };

        let unknown_chunks = decoded.contains_unknown_chunks();
        let started = Instant::now();
        let events = match decoded.packet {
            Packet::Unknown(chunk) => {
                self.counters.unknown_root_packets += 1;
                debug!("[DECODER] dropped packet with unknown root 0x{:04x}", chunk.chunk_id);
                return Vec::new();
            }
            Packet::Data(packet) => {
                self.note_flags(unknown_chunks);
                match FramePart::from_data(packet) {
                    Ok(part) => self.data.push(part, &mut self.store),
                    Err(reason) => vec![self.reject(PacketKind::Data, reason)],
                }
            }
            Packet::Info(packet) => {
                self.note_flags(unknown_chunks);
                match FramePart::from_info(packet) {
                    Ok(part) => self.info.push(part, &mut self.store),
                    Err(reason) => vec![self.reject(PacketKind::Info, reason)],
                }
            }
        };
        self.timer.add_stage_time(Stage::Reassemble, started.elapsed());

        for event in &events {
            self.record(event);
        }
        events
    }

    /// Immutable view of every tracker seen so far.
    pub fn trackers(&self) -> Arc<TrackerMap> {
        self.store.snapshot()
    }

    pub fn tracker(&self, id: u16) -> Option<&Tracker> {
        self.store.get(id)
    }

    /// System name from the most recent completed info frame.
    pub fn system_name(&self) -> Option<&str> {
        self.system_name.as_deref()
    }

    pub fn counters(&self) -> &TelemetryCounters {
        &self.counters
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from(&self.counters, &self.timer)
    }

    /// Drop any partially collected frames. The store is kept.
    pub fn reset_pending(&mut self) {
        self.data.reset();
        self.info.reset();
    }

    pub(crate) fn record_dropped_event(&mut self) {
        self.counters.events_dropped += 1;
    }

    fn note_flags(&mut self, unknown_chunks: bool) {
        if unknown_chunks {
            self.counters.unknown_chunk_packets += 1;
        }
    }

    fn reject(&mut self, kind: PacketKind, reason: RejectReason) -> ReassemblyEvent {
        warn!("[DECODER] {kind} packet rejected: {reason}");
        self.counters.packets_rejected += 1;
        ReassemblyEvent::PacketRejected { kind, reason }
    }

    fn record(&mut self, event: &ReassemblyEvent) {
        match event {
            ReassemblyEvent::Update { kind, system_name, .. } => {
                self.counters.frames_completed += 1;
                if *kind == PacketKind::Info {
                    if let Some(name) = system_name {
                        self.system_name = Some(name.clone());
                    }
                }
            }
            ReassemblyEvent::IncompleteFrameDiscarded { .. } => self.counters.frames_discarded_incomplete += 1,
            ReassemblyEvent::DuplicateTrackerId { .. } => self.counters.frames_discarded_duplicate += 1,
            ReassemblyEvent::PacketRejected { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkWriter;
    use crate::constants::{data_packet, root_ids};
    use crate::fragment::{encode_info_frame, FrameMeta};
    use crate::packet::frame_header_payload;
    use crate::packet::FrameHeader;

    #[test]
    fn garbage_is_dropped_silently() {
        let mut dec = Decoder::new();
        assert!(dec.on_received(&[0xde, 0xad]).is_empty());
        assert_eq!(dec.counters().decode_failures, 1);
        assert_eq!(dec.counters().datagrams_received, 1);
    }

    #[test]
    fn unknown_root_is_dropped() {
        let mut w = ChunkWriter::new();
        w.leaf(0x1234, &[1, 2, 3]).unwrap();
        let mut dec = Decoder::new();
        assert!(dec.on_received(&w.finish().unwrap()).is_empty());
        assert_eq!(dec.counters().unknown_root_packets, 1);
    }

    #[test]
    fn missing_tracker_list_is_rejected() {
        let mut w = ChunkWriter::new();
        w.container(root_ids::DATA_PACKET, |w| {
            w.leaf(data_packet::FRAME_HEADER, &frame_header_payload(&FrameHeader::new(1, 0, 1)))
        })
        .unwrap();

        let mut dec = Decoder::new();
        let events = dec.on_received(&w.finish().unwrap());
        assert_eq!(
            events,
            vec![ReassemblyEvent::PacketRejected { kind: PacketKind::Data, reason: RejectReason::MissingTrackerList }]
        );
        assert_eq!(dec.counters().packets_rejected, 1);
    }

    #[test]
    fn info_frame_sets_names() {
        let trackers = vec![Tracker::new(4).with_name("spot")];
        let wire = encode_info_frame(&trackers, "rig", &FrameMeta::new(50, 0), 1500).unwrap();

        let mut dec = Decoder::new();
        let events = dec.on_received(&wire[0]);
        assert!(events[0].is_update());
        assert_eq!(dec.system_name(), Some("rig"));
        assert_eq!(dec.tracker(4).unwrap().name.as_deref(), Some("spot"));
        assert_eq!(dec.tracker(4).unwrap().info_timestamp, Some(50));
        assert_eq!(dec.counters().frames_completed, 1);
    }
}
