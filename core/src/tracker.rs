//! tracker.rs
//! Tracker value type.
//!
//! A tracker is identified by its `id` alone. Every other field is optional:
//! a sender only transmits what it knows, and a receiver only overwrites what
//! it was sent.

use serde::{Deserialize, Serialize};

/// Three little-endian `f32` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Float3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Float3 {
    pub const ZERO: Float3 = Float3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Float3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Last known state of one tracked object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tracker {
    pub id: u16,
    pub name: Option<String>,
    pub pos: Option<Float3>,
    pub speed: Option<Float3>,
    pub ori: Option<Float3>,
    pub accel: Option<Float3>,
    pub target_pos: Option<Float3>,
    /// Sender-side tracker timestamp (tracker timestamp chunk).
    pub timestamp: Option<u64>,
    /// Status chunk.
    pub validity: Option<f32>,

    /// Receive side: timestamp of the last data frame that carried this tracker.
    #[serde(default)]
    pub data_timestamp: Option<u64>,
    /// Receive side: timestamp of the last info frame that carried this tracker.
    #[serde(default)]
    pub info_timestamp: Option<u64>,
}

impl Tracker {
    pub fn new(id: u16) -> Self {
        Self { id, ..Default::default() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_pos(mut self, pos: impl Into<Float3>) -> Self {
        self.pos = Some(pos.into());
        self
    }

    pub fn with_speed(mut self, speed: impl Into<Float3>) -> Self {
        self.speed = Some(speed.into());
        self
    }

    pub fn with_ori(mut self, ori: impl Into<Float3>) -> Self {
        self.ori = Some(ori.into());
        self
    }

    pub fn with_accel(mut self, accel: impl Into<Float3>) -> Self {
        self.accel = Some(accel.into());
        self
    }

    pub fn with_target_pos(mut self, target_pos: impl Into<Float3>) -> Self {
        self.target_pos = Some(target_pos.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_validity(mut self, validity: f32) -> Self {
        self.validity = Some(validity);
        self
    }

    /// True when the tracker carries at least one data-frame field.
    pub fn has_data_fields(&self) -> bool {
        self.pos.is_some()
            || self.speed.is_some()
            || self.ori.is_some()
            || self.accel.is_some()
            || self.target_pos.is_some()
            || self.timestamp.is_some()
            || self.validity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_only_named_fields() {
        let t = Tracker::new(4).with_name("spot").with_pos([1.0, 2.0, 3.0]).with_validity(0.5);
        assert_eq!(t.id, 4);
        assert_eq!(t.name.as_deref(), Some("spot"));
        assert_eq!(t.pos, Some(Float3::new(1.0, 2.0, 3.0)));
        assert_eq!(t.validity, Some(0.5));
        assert!(t.speed.is_none());
        assert!(t.data_timestamp.is_none());
        assert!(t.has_data_fields());
        assert!(!Tracker::new(1).with_name("x").has_data_fields());
    }
}
