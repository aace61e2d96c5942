//! Repository layer for ledger-store operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `positions.rs` - Position writes, reads, and the eligibility scan
//! - `distributions.rs` - Distribution record reads
//!
//! The two multi-table transactions of the engine — the per-period payout and
//! the position completion — live here, since each spans positions, balances,
//! distribution records, and the transaction log atomically.

mod distributions;
mod positions;

use crate::domain::{Decimal, LedgerEntryKind, Position, PositionId, TimeMs, UserId};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::str::FromStr;
use thiserror::Error;

/// Storage-layer error.
///
/// `Corrupt` marks a stored value that no longer parses (a mangled decimal or
/// an unknown enum tag). It is surfaced per position by the orchestrator
/// rather than defaulted away, since defaulting would silently misstate money.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("corrupt {column} on {entity} {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: String,
        column: &'static str,
        reason: String,
    },
}

pub(crate) fn parse_decimal(
    entity: &'static str,
    id: &str,
    column: &'static str,
    value: &str,
) -> Result<Decimal, StoreError> {
    Decimal::from_str(value).map_err(|e| StoreError::Corrupt {
        entity,
        id: id.to_string(),
        column,
        reason: e.to_string(),
    })
}

/// Active-position row from the eligibility scan, with its paid-period count.
///
/// Decimal and enum columns stay raw here so one mangled row surfaces as a
/// per-position error instead of failing the whole scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedPosition {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub principal: String,
    pub rate: String,
    pub period_count: i64,
    pub start_time_ms: i64,
    pub status: String,
    pub accumulated_profit: String,
    pub created_at_ms: i64,
    pub completed_at_ms: Option<i64>,
    /// Count of distinct distribution records for this position.
    pub paid_periods: i64,
}

/// Result of attempting one period payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutOutcome {
    /// The period was paid and all four writes committed.
    Recorded,
    /// A concurrent run already paid this period; nothing was written.
    AlreadyPaid,
}

/// Result of attempting to complete a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The position transitioned to completed and principal was returned.
    Completed,
    /// The position was no longer active; nothing was written.
    AlreadyCompleted,
}

/// Repository for ledger-store operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Period payout (single atomic transaction per period)
    // =========================================================================

    /// Pay one period of one position atomically.
    ///
    /// In a single transaction: insert the distribution record, credit the
    /// user's balance, append a profit log entry, and bump the position's
    /// accumulated profit. The record insert is the conflict detector: if the
    /// (position, period key) pair already exists, the transaction is rolled
    /// back and `AlreadyPaid` is returned — a concurrent run won the period.
    ///
    /// # Errors
    /// Returns an error if any write fails or a stored decimal is corrupt.
    pub async fn record_period_payout(
        &self,
        position: &Position,
        period_key: TimeMs,
        profit: Decimal,
        description: &str,
        now: TimeMs,
    ) -> Result<PayoutOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO distribution_records
            (position_id, user_id, period_key_ms, principal, profit_amount, created_at_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(position_id, period_key_ms) DO NOTHING
            "#,
        )
        .bind(position.id.as_str())
        .bind(position.user_id.as_str())
        .bind(period_key.as_ms())
        .bind(position.principal.to_canonical_string())
        .bind(profit.to_canonical_string())
        .bind(now.as_ms())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(PayoutOutcome::AlreadyPaid);
        }

        credit_balance(&mut tx, &position.user_id, profit).await?;
        append_ledger_entry(
            &mut tx,
            &position.user_id,
            LedgerEntryKind::Profit,
            profit,
            description,
            now,
        )
        .await?;

        let row = sqlx::query("SELECT accumulated_profit FROM positions WHERE id = ?")
            .bind(position.id.as_str())
            .fetch_one(&mut *tx)
            .await?;
        let accumulated: String = row.get("accumulated_profit");
        let accumulated = parse_decimal(
            "position",
            position.id.as_str(),
            "accumulated_profit",
            &accumulated,
        )?;

        sqlx::query("UPDATE positions SET accumulated_profit = ? WHERE id = ?")
            .bind((accumulated + profit).to_canonical_string())
            .bind(position.id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(PayoutOutcome::Recorded)
    }

    // =========================================================================
    // Completion (single atomic transaction per position)
    // =========================================================================

    /// Complete a fully paid position and return its principal atomically.
    ///
    /// The status transition is the exactly-once gate: the guarded UPDATE
    /// only matches while the position is still active, so a concurrent run
    /// that loses the race writes nothing and sees `AlreadyCompleted`.
    ///
    /// # Errors
    /// Returns an error if any write fails or a stored decimal is corrupt.
    pub async fn complete_position(
        &self,
        position: &Position,
        description: &str,
        now: TimeMs,
    ) -> Result<CompletionOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE positions SET status = 'completed', completed_at_ms = ? \
             WHERE id = ? AND status = 'active'",
        )
        .bind(now.as_ms())
        .bind(position.id.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        credit_balance(&mut tx, &position.user_id, position.principal).await?;
        append_ledger_entry(
            &mut tx,
            &position.user_id,
            LedgerEntryKind::CapitalReturn,
            position.principal,
            description,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(CompletionOutcome::Completed)
    }

    // =========================================================================
    // Balance and transaction-log reads
    // =========================================================================

    /// Current balance for a user. Zero when the user has no balance row yet.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored balance is corrupt.
    pub async fn get_balance(&self, user_id: &UserId) -> Result<Decimal, StoreError> {
        let row = sqlx::query("SELECT total_balance FROM balances WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let balance: String = row.get("total_balance");
                parse_decimal("balance", user_id.as_str(), "total_balance", &balance)
            }
            None => Ok(Decimal::zero()),
        }
    }

    /// Transaction-log entries for a user, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored value is corrupt.
    pub async fn list_ledger_entries(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<crate::domain::LedgerEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, kind, amount, description, created_at_ms
            FROM transaction_log
            WHERE user_id = ?
            ORDER BY created_at_ms ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id: i64 = row.get("id");
                let kind: String = row.get("kind");
                let amount: String = row.get("amount");
                let kind = LedgerEntryKind::parse(&kind).ok_or_else(|| StoreError::Corrupt {
                    entity: "transaction_log",
                    id: id.to_string(),
                    column: "kind",
                    reason: format!("unknown kind {:?}", kind),
                })?;
                Ok(crate::domain::LedgerEntry {
                    id,
                    user_id: UserId::new(row.get::<String, _>("user_id")),
                    kind,
                    amount: parse_decimal("transaction_log", &id.to_string(), "amount", &amount)?,
                    description: row.get("description"),
                    created_at_ms: TimeMs::new(row.get("created_at_ms")),
                })
            })
            .collect()
    }
}

/// Credit a user's balance inside an open transaction.
///
/// The stored decimal is read, added to in Rust, and written back; SQLite's
/// numeric types would round money.
async fn credit_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &UserId,
    amount: Decimal,
) -> Result<(), StoreError> {
    let row = sqlx::query("SELECT total_balance FROM balances WHERE user_id = ?")
        .bind(user_id.as_str())
        .fetch_optional(&mut **tx)
        .await?;

    match row {
        Some(row) => {
            let balance: String = row.get("total_balance");
            let balance = parse_decimal("balance", user_id.as_str(), "total_balance", &balance)?;
            sqlx::query("UPDATE balances SET total_balance = ? WHERE user_id = ?")
                .bind((balance + amount).to_canonical_string())
                .bind(user_id.as_str())
                .execute(&mut **tx)
                .await?;
        }
        None => {
            sqlx::query("INSERT INTO balances (user_id, total_balance) VALUES (?, ?)")
                .bind(user_id.as_str())
                .bind(amount.to_canonical_string())
                .execute(&mut **tx)
                .await?;
        }
    }

    Ok(())
}

/// Append one audit entry inside an open transaction.
async fn append_ledger_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &UserId,
    kind: LedgerEntryKind,
    amount: Decimal,
    description: &str,
    now: TimeMs,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO transaction_log (user_id, kind, amount, description, created_at_ms)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id.as_str())
    .bind(kind.as_str())
    .bind(amount.to_canonical_string())
    .bind(description)
    .bind(now.as_ms())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

impl ScannedPosition {
    /// Parse the raw row into a domain position.
    ///
    /// # Errors
    /// Returns an error if a decimal or enum column is corrupt.
    pub fn parse(&self) -> Result<Position, StoreError> {
        let kind =
            crate::domain::PositionKind::parse(&self.kind).ok_or_else(|| StoreError::Corrupt {
                entity: "position",
                id: self.id.clone(),
                column: "kind",
                reason: format!("unknown kind {:?}", self.kind),
            })?;
        let status = crate::domain::PositionStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt {
                entity: "position",
                id: self.id.clone(),
                column: "status",
                reason: format!("unknown status {:?}", self.status),
            }
        })?;

        Ok(Position {
            id: PositionId::new(self.id.clone()),
            user_id: UserId::new(self.user_id.clone()),
            kind,
            principal: parse_decimal("position", &self.id, "principal", &self.principal)?,
            rate: parse_decimal("position", &self.id, "rate", &self.rate)?,
            period_count: self.period_count,
            start_time_ms: TimeMs::new(self.start_time_ms),
            status,
            accumulated_profit: parse_decimal(
                "position",
                &self.id,
                "accumulated_profit",
                &self.accumulated_profit,
            )?,
            created_at_ms: TimeMs::new(self.created_at_ms),
            completed_at_ms: self.completed_at_ms.map(TimeMs::new),
        })
    }
}
