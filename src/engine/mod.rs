//! Pure computation for the distribution engine.
//!
//! Period arithmetic and missing-period reconciliation are plain functions of
//! their inputs — no clock, no database — so the catch-up rules are unit
//! testable in isolation.

pub mod period;
pub mod reconcile;

pub use period::{PeriodSchedule, PeriodUnit};
pub use reconcile::missing_period_keys;
