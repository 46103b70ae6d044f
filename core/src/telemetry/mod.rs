//! telemetry/mod.rs
//! Counters, stage timers and immutable snapshots for the send and receive
//! engines.
//!
//! Counters are owned by one engine at a time, so they are plain integers
//! rather than atomics. A snapshot is a copy; later traffic never changes it.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
