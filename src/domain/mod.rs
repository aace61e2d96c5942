//! Domain types for the distribution engine.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, UserId, PositionId
//! - Position and ledger record types with their lifecycle invariants

pub mod decimal;
pub mod ledger;
pub mod position;
pub mod primitives;

pub use decimal::Decimal;
pub use ledger::{DistributionRecord, LedgerEntry, LedgerEntryKind};
pub use position::{Position, PositionError, PositionKind, PositionStatus};
pub use primitives::{PositionId, TimeMs, UserId};
