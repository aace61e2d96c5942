//! Run orchestration: scanning, per-position catch-up, and run reports.

pub mod executor;
pub mod orchestrator;

pub use executor::{catch_up_position, CatchUpOutcome};
pub use orchestrator::{Orchestrator, OrchestrationError, RunReport};
