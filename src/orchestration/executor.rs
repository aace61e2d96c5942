//! Distribution executor and completion handler for a single position.

use crate::db::{CompletionOutcome, PayoutOutcome, Repository, StoreError};
use crate::domain::{Position, TimeMs};
use crate::engine::period::{PeriodSchedule, PeriodUnit};
use crate::engine::reconcile::missing_period_keys;
use tracing::debug;

/// What catch-up did for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatchUpOutcome {
    /// Periods paid by this run.
    pub periods_paid: usize,
    /// Periods found already paid by a concurrent run.
    pub periods_skipped: usize,
    /// True if this run performed the completion transition.
    pub completed: bool,
}

/// Bring one position fully up to date as of `now`.
///
/// Recomputes the missing-period set against the recorded keys, pays each
/// missing period in increasing key order (one transaction per period), and
/// performs the completion transition once the configured duration is
/// reached. Periods already covered by a concurrent run are skipped without
/// error; periods committed earlier in this run are never rolled back.
///
/// # Errors
/// Returns the first storage error encountered. Committed periods stay
/// committed; the next run resumes from the first missing period.
pub async fn catch_up_position(
    repo: &Repository,
    position: &Position,
    now: TimeMs,
) -> Result<CatchUpOutcome, StoreError> {
    let unit = PeriodUnit::for_kind(position.kind);
    let schedule = PeriodSchedule::compute(position.start_time_ms, now, unit, position.period_count);
    let paid = repo.list_period_keys(&position.id).await?;
    let missing = missing_period_keys(&schedule, &paid);

    let profit = position.profit_per_period();
    let mut outcome = CatchUpOutcome::default();

    for key in missing {
        let description = format!(
            "Profit payout for {} {} period {}",
            position.kind,
            position.id,
            unit.format_key(key)
        );
        match repo
            .record_period_payout(position, key, profit, &description, now)
            .await?
        {
            PayoutOutcome::Recorded => {
                debug!(
                    position_id = %position.id,
                    period_key = key.as_ms(),
                    profit = %profit,
                    "period paid"
                );
                outcome.periods_paid += 1;
            }
            PayoutOutcome::AlreadyPaid => {
                debug!(
                    position_id = %position.id,
                    period_key = key.as_ms(),
                    "period already paid by a concurrent run"
                );
                outcome.periods_skipped += 1;
            }
        }
    }

    if schedule.duration_reached {
        let description = format!(
            "Capital return for {} {} after {} periods",
            position.kind, position.id, position.period_count
        );
        match repo
            .complete_position(position, &description, now)
            .await?
        {
            CompletionOutcome::Completed => {
                debug!(position_id = %position.id, principal = %position.principal, "position completed");
                outcome.completed = true;
            }
            CompletionOutcome::AlreadyCompleted => {
                debug!(position_id = %position.id, "position already completed");
            }
        }
    }

    Ok(outcome)
}
