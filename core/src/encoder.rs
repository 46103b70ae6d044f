//! encoder.rs
//! Send engine: current tracker set to encoded datagrams.
//!
//! Design notes:
//! - The tracker set is an `Arc<Vec<Tracker>>` behind one mutex. Replacing it
//!   swaps the `Arc`; an encode in progress keeps the set it started with.
//! - Data and info frame ids are independent wrapping counters. A counter
//!   only moves once its frame has encoded; each kind has one sending thread.
//! - The engine is `Sync`; the data and info timers share one instance.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::trace;

use crate::config::ServerConfig;
use crate::constants::{MAX_PACKET_LEN, PSN_VERSION_HIGH, PSN_VERSION_LOW};
use crate::fragment::{encode_data_frame, encode_info_frame, FragmentError, FrameMeta};
use crate::tracker::Tracker;

#[derive(Debug)]
pub struct Encoder {
    trackers: Mutex<Arc<Vec<Tracker>>>,
    system_name: String,
    version_high: u8,
    version_low: u8,
    max_packet_len: usize,
    data_frame_id: AtomicU8,
    info_frame_id: AtomicU8,
}

impl Encoder {
    pub fn new(system_name: impl Into<String>) -> Self {
        Self {
            trackers: Mutex::new(Arc::new(Vec::new())),
            system_name: system_name.into(),
            version_high: PSN_VERSION_HIGH,
            version_low: PSN_VERSION_LOW,
            max_packet_len: MAX_PACKET_LEN,
            data_frame_id: AtomicU8::new(0),
            info_frame_id: AtomicU8::new(0),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            version_high: config.version_high,
            version_low: config.version_low,
            max_packet_len: config.max_packet_len,
            ..Self::new(config.system_name.clone())
        }
    }

    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    /// Replace the tracker set used by every later frame.
    ///
    /// # Errors
    /// `FragmentError::DuplicateTrackerId` if two trackers share an id; the
    /// previous set stays in place.
    pub fn set_trackers(&self, trackers: Vec<Tracker>) -> Result<(), FragmentError> {
        let mut seen = HashSet::with_capacity(trackers.len());
        if let Some(t) = trackers.iter().find(|t| !seen.insert(t.id)) {
            return Err(FragmentError::DuplicateTrackerId(t.id));
        }
        *self.trackers.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(trackers);
        Ok(())
    }

    /// The set the next frame will be built from.
    pub fn trackers(&self) -> Arc<Vec<Tracker>> {
        Arc::clone(&self.trackers.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Encode one data frame stamped with `timestamp`.
    pub fn encode_data(&self, timestamp: u64) -> Result<Vec<Vec<u8>>, FragmentError> {
        let trackers = self.trackers();
        let meta = self.meta(timestamp, &self.data_frame_id);
        let packets = encode_data_frame(&trackers, &meta, self.max_packet_len)?;
        self.data_frame_id.fetch_add(1, Ordering::Relaxed);
        trace!("[ENCODER] data frame {} -> {} packets", meta.frame_id, packets.len());
        Ok(packets)
    }

    /// Encode one info frame stamped with `timestamp`.
    pub fn encode_info(&self, timestamp: u64) -> Result<Vec<Vec<u8>>, FragmentError> {
        let trackers = self.trackers();
        let meta = self.meta(timestamp, &self.info_frame_id);
        let packets = encode_info_frame(&trackers, &self.system_name, &meta, self.max_packet_len)?;
        self.info_frame_id.fetch_add(1, Ordering::Relaxed);
        trace!("[ENCODER] info frame {} -> {} packets", meta.frame_id, packets.len());
        Ok(packets)
    }

    fn meta(&self, timestamp: u64, counter: &AtomicU8) -> FrameMeta {
        FrameMeta {
            timestamp,
            version_high: self.version_high,
            version_low: self.version_low,
            frame_id: counter.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{decode_packet, Packet};

    fn frame_id(bytes: &[u8]) -> u8 {
        match decode_packet(bytes).unwrap().packet {
            Packet::Data(p) => p.frame_headers().next().unwrap().frame_id,
            Packet::Info(p) => p.frame_headers().next().unwrap().frame_id,
            Packet::Unknown(_) => panic!("unknown root"),
        }
    }

    #[test]
    fn data_and_info_counters_are_independent() {
        let enc = Encoder::new("sys");
        enc.set_trackers(vec![Tracker::new(1).with_pos([1.0, 2.0, 3.0])]).unwrap();

        assert_eq!(frame_id(&enc.encode_data(1).unwrap()[0]), 0);
        assert_eq!(frame_id(&enc.encode_data(2).unwrap()[0]), 1);
        assert_eq!(frame_id(&enc.encode_info(2).unwrap()[0]), 0);
        assert_eq!(frame_id(&enc.encode_data(3).unwrap()[0]), 2);
    }

    #[test]
    fn frame_id_wraps() {
        let enc = Encoder::new("sys");
        for _ in 0..256 {
            enc.encode_data(0).unwrap();
        }
        assert_eq!(frame_id(&enc.encode_data(0).unwrap()[0]), 0);
    }

    #[test]
    fn failed_frame_does_not_use_up_an_id() {
        let enc = Encoder::new("sys");
        enc.set_trackers(vec![Tracker::new(1).with_name("n".repeat(2000))]).unwrap();
        assert!(matches!(enc.encode_info(1), Err(FragmentError::TrackerTooLarge { tracker_id: 1, .. })));
        enc.encode_data(1).unwrap();

        enc.set_trackers(vec![Tracker::new(1).with_name("short")]).unwrap();
        assert_eq!(frame_id(&enc.encode_info(2).unwrap()[0]), 0);
        assert_eq!(frame_id(&enc.encode_info(3).unwrap()[0]), 1);
    }

    #[test]
    fn duplicate_ids_keep_previous_set() {
        let enc = Encoder::new("sys");
        enc.set_trackers(vec![Tracker::new(3)]).unwrap();
        let err = enc.set_trackers(vec![Tracker::new(1), Tracker::new(1)]).unwrap_err();
        assert_eq!(err, FragmentError::DuplicateTrackerId(1));
        assert_eq!(enc.trackers()[0].id, 3);
    }

    #[test]
    fn held_set_survives_replacement() {
        let enc = Encoder::new("sys");
        enc.set_trackers(vec![Tracker::new(1)]).unwrap();
        let held = enc.trackers();
        enc.set_trackers(vec![Tracker::new(2), Tracker::new(3)]).unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(enc.trackers().len(), 2);
    }
}
