//! telemetry/snapshot.rs
//! Immutable, serializable view of counters and stage times.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub counters: TelemetryCounters,
    /// Completed frames over all frames that reached a verdict. Zero before
    /// the first verdict.
    pub frame_completion_ratio: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let finished = counters.frames_finished();
        let frame_completion_ratio = if finished > 0 {
            counters.frames_completed as f64 / finished as f64
        } else {
            0.0
        };

        Self {
            counters: counters.clone(),
            frame_completion_ratio,
            elapsed: timer.elapsed(),
            stage_times: timer.stage_times.clone(),
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    /// Internal consistency: ratio in range and stage time within elapsed.
    pub fn sanity_check(&self) -> bool {
        (0.0..=1.0).contains(&self.frame_completion_ratio) && self.total_stage_time() <= self.elapsed
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
