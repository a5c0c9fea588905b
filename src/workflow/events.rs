//! Stage-transition event records for observability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyzing,
    Retrieving,
    Generating,
    Checking,
    Refining,
    Done,
}

/// One stage transition with a monotonically increasing step index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    pub step_index: u32,
    pub stage: Stage,
    pub duration_ms: u64,
    pub detail: Value,
    pub at: DateTime<Utc>,
}

/// Per-request event log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<StageEvent>,
    next_index: u32,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, duration_ms: u64, detail: Value) {
        let event = StageEvent {
            step_index: self.next_index,
            stage,
            duration_ms,
            detail,
            at: Utc::now(),
        };
        log::debug!("stage {:?} finished in {}ms (step {})", stage, duration_ms, event.step_index);
        self.events.push(event);
        self.next_index += 1;
    }

    pub fn into_events(self) -> Vec<StageEvent> {
        self.events
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.events.iter().map(|e| e.duration_ms).sum()
    }
}
