//! telemetry/counters.rs
//! Plain counters updated by the send and receive engines.
//!
//! Each engine owns its counters and mutates them without locks; callers that
//! want a combined view `merge` copies.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    // --- receive ---
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub decode_failures: u64,
    pub unknown_chunk_packets: u64,
    pub unknown_root_packets: u64,
    pub packets_rejected: u64,
    pub frames_completed: u64,
    pub frames_discarded_incomplete: u64,
    pub frames_discarded_duplicate: u64,
    pub events_dropped: u64,

    // --- send ---
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub frames_sent: u64,
    pub send_failures: u64,
}

impl TelemetryCounters {
    pub fn add_received(&mut self, len: usize) {
        self.datagrams_received += 1;
        self.bytes_received += len as u64;
    }

    /// Record one encoded frame handed to the transport.
    pub fn add_sent_frame(&mut self, packets: usize, bytes: usize) {
        self.frames_sent += 1;
        self.packets_sent += packets as u64;
        self.bytes_sent += bytes as u64;
    }

    /// Frames that reached the reassembler's completion step, applied or not.
    pub fn frames_finished(&self) -> u64 {
        self.frames_completed + self.frames_discarded_incomplete + self.frames_discarded_duplicate
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        *self += other.clone();
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.datagrams_received          += rhs.datagrams_received;
        self.bytes_received              += rhs.bytes_received;
        self.decode_failures             += rhs.decode_failures;
        self.unknown_chunk_packets       += rhs.unknown_chunk_packets;
        self.unknown_root_packets        += rhs.unknown_root_packets;
        self.packets_rejected            += rhs.packets_rejected;
        self.frames_completed            += rhs.frames_completed;
        self.frames_discarded_incomplete += rhs.frames_discarded_incomplete;
        self.frames_discarded_duplicate  += rhs.frames_discarded_duplicate;
        self.events_dropped              += rhs.events_dropped;

        self.packets_sent                += rhs.packets_sent;
        self.bytes_sent                  += rhs.bytes_sent;
        self.frames_sent                 += rhs.frames_sent;
        self.send_failures               += rhs.send_failures;
    }
}
