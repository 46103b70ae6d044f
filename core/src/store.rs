//! store.rs
//! Last-known tracker state on the receive side.
//!
//! The map lives behind an `Arc`. Readers get a cheap immutable snapshot;
//! a completed frame mutates through `Arc::make_mut`, which copies only when a
//! snapshot is still held somewhere. Entries are never evicted here.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::packet::{DataTrackerChunk, DataTrackerNode, InfoTrackerChunk, InfoTrackerNode};
use crate::tracker::Tracker;

pub type TrackerMap = BTreeMap<u16, Tracker>;

/// Field-level update carried by one tracker chunk of a frame.
pub trait TrackerPatch {
    fn tracker_id(&self) -> u16;

    /// Set every field present in the chunk. Absent fields are left as they were.
    fn apply_to(&self, tracker: &mut Tracker);

    /// Record `timestamp` as this frame kind's last-received marker.
    fn mark_received(tracker: &mut Tracker, timestamp: u64);
}

impl TrackerPatch for DataTrackerNode {
    fn tracker_id(&self) -> u16 {
        self.id
    }

    fn apply_to(&self, tracker: &mut Tracker) {
        for chunk in &self.chunks {
            match chunk {
                DataTrackerChunk::Position(v) => tracker.pos = Some(*v),
                DataTrackerChunk::Speed(v) => tracker.speed = Some(*v),
                DataTrackerChunk::Orientation(v) => tracker.ori = Some(*v),
                DataTrackerChunk::Status(v) => tracker.validity = Some(*v),
                DataTrackerChunk::Acceleration(v) => tracker.accel = Some(*v),
                DataTrackerChunk::TargetPosition(v) => tracker.target_pos = Some(*v),
                DataTrackerChunk::Timestamp(v) => tracker.timestamp = Some(*v),
                DataTrackerChunk::Unknown(_) => {}
            }
        }
    }

    fn mark_received(tracker: &mut Tracker, timestamp: u64) {
        tracker.data_timestamp = Some(timestamp);
    }
}

impl TrackerPatch for InfoTrackerNode {
    fn tracker_id(&self) -> u16 {
        self.id
    }

    fn apply_to(&self, tracker: &mut Tracker) {
        for chunk in &self.chunks {
            if let InfoTrackerChunk::Name(name) = chunk {
                tracker.name = Some(name.clone());
            }
        }
    }

    fn mark_received(tracker: &mut Tracker, timestamp: u64) {
        tracker.info_timestamp = Some(timestamp);
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackerStore {
    trackers: Arc<TrackerMap>,
}

impl TrackerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Immutable view of every tracker seen so far.
    pub fn snapshot(&self) -> Arc<TrackerMap> {
        Arc::clone(&self.trackers)
    }

    pub fn get(&self, id: u16) -> Option<&Tracker> {
        self.trackers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Create-or-update every tracker of one completed frame.
    ///
    /// Caller guarantees tracker ids in `patches` are unique.
    pub(crate) fn apply_frame<P: TrackerPatch>(&mut self, timestamp: u64, patches: &[P]) {
        let map = Arc::make_mut(&mut self.trackers);
        for patch in patches {
            let id = patch.tracker_id();
            let tracker = map.entry(id).or_insert_with(|| Tracker::new(id));
            patch.apply_to(tracker);
            P::mark_received(tracker, timestamp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Float3;

    #[test]
    fn absent_fields_keep_previous_values() {
        let mut store = TrackerStore::new();
        store.apply_frame(
            10,
            &[DataTrackerNode::new(
                3,
                vec![DataTrackerChunk::Position(Float3::new(1.0, 1.0, 1.0)), DataTrackerChunk::Status(0.5)],
            )],
        );
        store.apply_frame(20, &[DataTrackerNode::new(3, vec![DataTrackerChunk::Speed(Float3::ZERO)])]);

        let t = store.get(3).unwrap();
        assert_eq!(t.pos, Some(Float3::new(1.0, 1.0, 1.0)));
        assert_eq!(t.speed, Some(Float3::ZERO));
        assert_eq!(t.validity, Some(0.5));
        assert_eq!(t.data_timestamp, Some(20));
        assert_eq!(t.info_timestamp, None);
    }

    #[test]
    fn snapshots_are_isolated_from_later_frames() {
        let mut store = TrackerStore::new();
        store.apply_frame(1, &[InfoTrackerNode::new(1, vec![InfoTrackerChunk::Name("a".into())])]);
        let before = store.snapshot();
        store.apply_frame(2, &[InfoTrackerNode::new(1, vec![InfoTrackerChunk::Name("b".into())])]);

        assert_eq!(before[&1].name.as_deref(), Some("a"));
        assert_eq!(store.get(1).unwrap().name.as_deref(), Some("b"));
        assert_eq!(store.get(1).unwrap().info_timestamp, Some(2));
    }
}
