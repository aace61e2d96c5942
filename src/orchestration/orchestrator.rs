//! Run orchestrator: scan, reconcile, execute, complete, report.

use crate::db::{Repository, ScannedPosition, StoreError};
use crate::domain::TimeMs;
use crate::engine::period::{PeriodSchedule, PeriodUnit};
use crate::orchestration::executor::catch_up_position;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Aggregated result of one distribution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Eligible positions the run attempted.
    pub processed: usize,
    /// Positions whose catch-up failed; retried on the next run.
    pub errored: usize,
    /// Positions completed by this run.
    pub completed: usize,
    /// Total periods paid across all positions.
    pub periods_paid: usize,
    /// Human summary line.
    pub message: String,
    /// One detail line per attempted position.
    pub details: Vec<String>,
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The eligibility scan failed; nothing was mutated.
    #[error("eligibility scan failed: {0}")]
    Scan(#[source] StoreError),
}

/// Sequences the catch-up run across all eligible positions.
///
/// Holds only a database handle; two orchestrators may run concurrently
/// against the same store — the per-period unique constraint is the only
/// coordination they need.
#[derive(Clone)]
pub struct Orchestrator {
    repo: Arc<Repository>,
}

impl Orchestrator {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Execute one distribution run as of `now`.
    ///
    /// Per-position failures are recorded in the report and do not abort the
    /// remaining positions. There is no internal retry: rerunning is the
    /// retry mechanism, since catch-up is idempotent.
    ///
    /// # Errors
    /// Returns an error only if the eligibility scan itself fails.
    pub async fn run(&self, now: TimeMs, trigger: &str) -> Result<RunReport, OrchestrationError> {
        let scanned = self
            .repo
            .scan_active_positions()
            .await
            .map_err(OrchestrationError::Scan)?;

        info!(trigger, scanned = scanned.len(), "distribution run started");

        let mut report = RunReport {
            processed: 0,
            errored: 0,
            completed: 0,
            periods_paid: 0,
            message: String::new(),
            details: Vec::new(),
        };

        for scanned_position in &scanned {
            if let Some(detail) = self.process_position(scanned_position, now, &mut report).await {
                report.details.push(detail);
            }
        }

        report.message = format!(
            "processed {} positions: {} periods paid, {} completed, {} errors",
            report.processed, report.periods_paid, report.completed, report.errored
        );
        info!(
            trigger,
            processed = report.processed,
            periods_paid = report.periods_paid,
            completed = report.completed,
            errored = report.errored,
            "distribution run finished"
        );

        Ok(report)
    }

    /// Handle one scanned position. Returns a detail line when the position
    /// was attempted, None when it was not yet eligible.
    async fn process_position(
        &self,
        scanned: &ScannedPosition,
        now: TimeMs,
        report: &mut RunReport,
    ) -> Option<String> {
        let position = match scanned.parse() {
            Ok(position) => position,
            Err(e) => {
                warn!(position_id = %scanned.id, error = %e, "skipping unreadable position");
                report.processed += 1;
                report.errored += 1;
                return Some(format!("position {}: error: {}", scanned.id, e));
            }
        };

        let unit = PeriodUnit::for_kind(position.kind);
        let schedule =
            PeriodSchedule::compute(position.start_time_ms, now, unit, position.period_count);

        // Eligible when periods are owed, or when fully paid but the
        // completion transition is still pending from an earlier failure.
        if schedule.payable <= scanned.paid_periods && !schedule.duration_reached {
            return None;
        }

        report.processed += 1;
        match catch_up_position(&self.repo, &position, now).await {
            Ok(outcome) => {
                report.periods_paid += outcome.periods_paid;
                if outcome.completed {
                    report.completed += 1;
                }
                let mut line = format!(
                    "position {}: {} periods paid",
                    position.id, outcome.periods_paid
                );
                if outcome.periods_skipped > 0 {
                    line.push_str(&format!(
                        ", {} already covered",
                        outcome.periods_skipped
                    ));
                }
                if outcome.completed {
                    line.push_str(", completed");
                }
                Some(line)
            }
            Err(e) => {
                warn!(position_id = %position.id, error = %e, "position catch-up failed");
                report.errored += 1;
                Some(format!("position {}: error: {}", position.id, e))
            }
        }
    }
}
