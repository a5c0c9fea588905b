//! Stateful generation pipeline: analyze → retrieve → generate → check, with
//! a bounded refinement loop and per-stage observability events.

pub mod engine;
pub mod events;

pub use engine::{AnalysisSummary, GenerationResult, WorkflowEngine, WorkflowInfo};
pub use events::{EventLog, Stage, StageEvent};
