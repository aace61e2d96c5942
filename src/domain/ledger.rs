//! Ledger records: distribution proofs and the append-only transaction log.

use crate::domain::{Decimal, PositionId, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Proof that one specific period of one specific position has been paid.
///
/// Immutable once created. At most one record exists per
/// (position id, period key) — the core correctness invariant of the engine,
/// enforced by a unique index in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub id: i64,
    pub position_id: PositionId,
    pub user_id: UserId,
    /// Scheduled timestamp of the paid period: start + n x period unit.
    pub period_key_ms: TimeMs,
    /// Principal snapshot at payout time.
    pub principal: Decimal,
    pub profit_amount: Decimal,
    pub created_at_ms: TimeMs,
}

/// Kind of balance mutation recorded in the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Profit,
    CapitalReturn,
}

impl LedgerEntryKind {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryKind::Profit => "profit",
            LedgerEntryKind::CapitalReturn => "capital_return",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profit" => Some(LedgerEntryKind::Profit),
            "capital_return" => Some(LedgerEntryKind::CapitalReturn),
            _ => None,
        }
    }
}

impl std::fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable audit entry for a balance mutation performed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: UserId,
    pub kind: LedgerEntryKind,
    pub amount: Decimal,
    pub description: String,
    pub created_at_ms: TimeMs,
}
