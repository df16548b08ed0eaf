//! Core engine — version resolution, per-query workers and their
//! orchestration.

pub mod orchestrator;
pub mod versions;
pub mod worker;

pub use orchestrator::{Orchestrator, RunningTrackers};
pub use versions::VersionLedger;
pub use worker::{QueryWorker, TickOutcome};
