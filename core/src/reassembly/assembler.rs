//! Per-kind frame state machine.
//!
//! ```text
//! Empty ──packet──▶ Collecting ──last packet──▶ Complete ──▶ Empty
//!   │                   │
//!   └─count == 1──▶ Complete      mismatch ──▶ Discarded ──▶ Collecting(arrival)
//! ```
//!
//! A frame is identified by its first packet's timestamp and
//! `frame_packet_count`. This structure is NOT thread-safe; the decoder owns
//! one per packet kind and feeds it in arrival order.

use std::collections::HashSet;

use log::{debug, warn};

use crate::packet::{FrameHeader, PacketKind};
use crate::reassembly::types::{FramePart, ReassemblyEvent};
use crate::store::{TrackerPatch, TrackerStore};

#[derive(Debug)]
enum AssemblyState<T> {
    Empty,
    Collecting { first: FrameHeader, parts: Vec<FramePart<T>> },
}

#[derive(Debug)]
pub struct FrameAssembler<T> {
    kind: PacketKind,
    state: AssemblyState<T>,
}

impl<T: TrackerPatch> FrameAssembler<T> {
    pub fn new(kind: PacketKind) -> Self {
        Self { kind, state: AssemblyState::Empty }
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.state, AssemblyState::Collecting { .. })
    }

    /// Packets buffered for the frame in progress.
    pub fn pending_packets(&self) -> usize {
        match &self.state {
            AssemblyState::Empty => 0,
            AssemblyState::Collecting { parts, .. } => parts.len(),
        }
    }

    /// Drop whatever is buffered without notifying.
    pub fn reset(&mut self) {
        self.state = AssemblyState::Empty;
    }

    /// Feed one validated packet.
    ///
    /// # Returns
    /// Notifications in the order they happened: at most one discard of the
    /// previous frame, then at most one completion outcome.
    pub fn push(&mut self, part: FramePart<T>, store: &mut TrackerStore) -> Vec<ReassemblyEvent> {
        let mut events = Vec::new();

        let state = std::mem::replace(&mut self.state, AssemblyState::Empty);
        let (first, mut parts) = match state {
            AssemblyState::Empty => (part.header, Vec::new()),
            AssemblyState::Collecting { first, parts } if same_frame(&first, &part.header) => (first, parts),
            AssemblyState::Collecting { first, parts } => {
                warn!(
                    "[REASSEMBLY] {} frame {} discarded: {}/{} packets, next packet has timestamp {} count {}",
                    self.kind, first.frame_id, parts.len(), first.frame_packet_count,
                    part.header.timestamp, part.header.frame_packet_count,
                );
                events.push(ReassemblyEvent::IncompleteFrameDiscarded {
                    kind: self.kind,
                    frame_id: first.frame_id,
                    timestamp: first.timestamp,
                    received: parts.len(),
                    expected: first.frame_packet_count,
                });
                (part.header, Vec::new())
            }
        };

        parts.push(part);
        if parts.len() < first.frame_packet_count as usize {
            self.state = AssemblyState::Collecting { first, parts };
            return events;
        }

        events.push(self.complete(first, parts, store));
        events
    }

    fn complete(&self, first: FrameHeader, parts: Vec<FramePart<T>>, store: &mut TrackerStore) -> ReassemblyEvent {
        let mut seen = HashSet::new();
        let mut system_name = None;
        let mut trackers = Vec::new();
        for part in parts {
            if system_name.is_none() {
                system_name = part.system_name;
            }
            for t in part.trackers {
                if !seen.insert(t.tracker_id()) {
                    warn!(
                        "[REASSEMBLY] {} frame {} discarded: tracker {} repeated",
                        self.kind, first.frame_id, t.tracker_id()
                    );
                    return ReassemblyEvent::DuplicateTrackerId {
                        kind: self.kind,
                        frame_id: first.frame_id,
                        tracker_id: t.tracker_id(),
                    };
                }
                trackers.push(t);
            }
        }

        store.apply_frame(first.timestamp, &trackers);
        debug!(
            "[REASSEMBLY] {} frame {} complete: {} trackers, {} known",
            self.kind, first.frame_id, trackers.len(), store.len()
        );
        ReassemblyEvent::Update {
            kind: self.kind,
            frame_id: first.frame_id,
            timestamp: first.timestamp,
            system_name,
            trackers: store.snapshot(),
        }
    }
}

#[inline]
fn same_frame(a: &FrameHeader, b: &FrameHeader) -> bool {
    a.timestamp == b.timestamp && a.frame_packet_count == b.frame_packet_count
}
