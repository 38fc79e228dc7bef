//! Cycle orchestration and scheduling for parlwatch.
//!
//! This crate ties fetching, extraction, deduplication, classification,
//! persistence, and notification into end-to-end monitoring cycles, and
//! drives them on configured intervals.

pub mod export;
pub mod pipeline;
pub mod scheduler;

pub use export::{ExportData, ExportStats, export_to_json};
pub use parlwatch_notify::Dispatch;
pub use pipeline::{CycleReport, Monitor};
pub use scheduler::Scheduler;
