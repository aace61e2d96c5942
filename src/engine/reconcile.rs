//! Reconciler: diff periods earned against periods already paid.
//!
//! A position may have been eligible for many periods — first run after
//! creation, service downtime — so one pass must backfill an arbitrary
//! number of missing periods. Never assume one run pays one period.

use crate::engine::period::PeriodSchedule;
use crate::domain::TimeMs;
use std::collections::BTreeSet;

/// Ordered list of period keys that have been earned but not yet paid.
///
/// Covers periods 1..=payable, excluding keys already present in `paid`.
/// An empty result means the position is fully caught up (for example a
/// concurrent run just finished) and must be skipped without error.
pub fn missing_period_keys(schedule: &PeriodSchedule, paid: &BTreeSet<i64>) -> Vec<TimeMs> {
    (1..=schedule.payable)
        .map(|n| schedule.key_for(n))
        .filter(|key| !paid.contains(&key.as_ms()))
        .collect()
}
