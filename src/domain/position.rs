//! Position types: a user's open Investment or LiveTrade commitment.

use crate::domain::{Decimal, PositionId, TimeMs, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accrual flavor of a position.
///
/// Investments accrue one profit period per day, live trades one per hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionKind {
    Investment,
    LiveTrade,
}

impl PositionKind {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionKind::Investment => "investment",
            PositionKind::LiveTrade => "live_trade",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "investment" => Some(PositionKind::Investment),
            "live_trade" => Some(PositionKind::LiveTrade),
            _ => None,
        }
    }
}

impl std::fmt::Display for PositionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a position.
///
/// Only `Active` positions are scanned for payouts. The transition to
/// `Completed` is the gate that makes capital return exactly-once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Active,
    Completed,
    Cancelled,
}

impl PositionStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Active => "active",
            PositionStatus::Completed => "completed",
            PositionStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PositionStatus::Active),
            "completed" => Some(PositionStatus::Completed),
            "cancelled" => Some(PositionStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's open commitment: principal locked for `period_count` accrual
/// periods at `rate` profit per period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub user_id: UserId,
    pub kind: PositionKind,
    /// Principal amount, > 0. Snapshot for payouts; never re-read mid-run.
    pub principal: Decimal,
    /// Per-period profit rate as a fraction (0.015 = 1.5%), >= 0.
    pub rate: Decimal,
    /// Total configured accrual periods, >= 1.
    pub period_count: i64,
    pub start_time_ms: TimeMs,
    pub status: PositionStatus,
    /// Running profit total, maintained by the distribution executor.
    pub accumulated_profit: Decimal,
    pub created_at_ms: TimeMs,
    pub completed_at_ms: Option<TimeMs>,
}

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("principal must be positive, got {0}")]
    NonPositivePrincipal(Decimal),
    #[error("rate must be non-negative, got {0}")]
    NegativeRate(Decimal),
    #[error("period count must be at least 1, got {0}")]
    InvalidPeriodCount(i64),
}

impl Position {
    /// Create a new active position with a generated id.
    ///
    /// # Errors
    /// Returns an error if an invariant is violated (principal <= 0,
    /// rate < 0, period_count < 1).
    pub fn new(
        user_id: UserId,
        kind: PositionKind,
        principal: Decimal,
        rate: Decimal,
        period_count: i64,
        start_time_ms: TimeMs,
        created_at_ms: TimeMs,
    ) -> Result<Self, PositionError> {
        if !principal.is_positive() {
            return Err(PositionError::NonPositivePrincipal(principal));
        }
        if rate.is_negative() {
            return Err(PositionError::NegativeRate(rate));
        }
        if period_count < 1 {
            return Err(PositionError::InvalidPeriodCount(period_count));
        }

        Ok(Position {
            id: PositionId::generate(),
            user_id,
            kind,
            principal,
            rate,
            period_count,
            start_time_ms,
            status: PositionStatus::Active,
            accumulated_profit: Decimal::zero(),
            created_at_ms,
            completed_at_ms: None,
        })
    }

    /// Profit paid for one period: principal x rate.
    ///
    /// Computed from the position's snapshot values so a period's payout
    /// never changes retroactively.
    pub fn profit_per_period(&self) -> Decimal {
        self.principal * self.rate
    }
}
