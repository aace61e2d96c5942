//! Position writes, reads, and the eligibility scan.

use crate::domain::{Position, PositionId, PositionStatus, TimeMs, UserId};
use sqlx::Row;

use super::{parse_decimal, Repository, ScannedPosition, StoreError};

impl Repository {
    /// Insert a position. Positions are created by the surrounding platform;
    /// the engine only ever mutates their profit total and status.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_position(&self, position: &Position) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO positions
            (id, user_id, kind, principal, rate, period_count, start_time_ms,
             status, accumulated_profit, created_at_ms, completed_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(position.id.as_str())
        .bind(position.user_id.as_str())
        .bind(position.kind.as_str())
        .bind(position.principal.to_canonical_string())
        .bind(position.rate.to_canonical_string())
        .bind(position.period_count)
        .bind(position.start_time_ms.as_ms())
        .bind(position.status.as_str())
        .bind(position.accumulated_profit.to_canonical_string())
        .bind(position.created_at_ms.as_ms())
        .bind(position.completed_at_ms.map(|t| t.as_ms()))
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Fetch one position by id.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored value is corrupt.
    pub async fn get_position(
        &self,
        position_id: &PositionId,
    ) -> Result<Option<Position>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, kind, principal, rate, period_count, start_time_ms,
                   status, accumulated_profit, created_at_ms, completed_at_ms
            FROM positions
            WHERE id = ?
            "#,
        )
        .bind(position_id.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| {
            let id: String = row.get("id");
            let kind: String = row.get("kind");
            let status: String = row.get("status");
            let kind =
                crate::domain::PositionKind::parse(&kind).ok_or_else(|| StoreError::Corrupt {
                    entity: "position",
                    id: id.clone(),
                    column: "kind",
                    reason: format!("unknown kind {:?}", kind),
                })?;
            let status = PositionStatus::parse(&status).ok_or_else(|| StoreError::Corrupt {
                entity: "position",
                id: id.clone(),
                column: "status",
                reason: format!("unknown status {:?}", status),
            })?;
            Ok(Position {
                principal: parse_decimal(
                    "position",
                    &id,
                    "principal",
                    &row.get::<String, _>("principal"),
                )?,
                rate: parse_decimal("position", &id, "rate", &row.get::<String, _>("rate"))?,
                accumulated_profit: parse_decimal(
                    "position",
                    &id,
                    "accumulated_profit",
                    &row.get::<String, _>("accumulated_profit"),
                )?,
                id: PositionId::new(id),
                user_id: UserId::new(row.get::<String, _>("user_id")),
                kind,
                period_count: row.get("period_count"),
                start_time_ms: TimeMs::new(row.get("start_time_ms")),
                status,
                created_at_ms: TimeMs::new(row.get("created_at_ms")),
                completed_at_ms: row.get::<Option<i64>, _>("completed_at_ms").map(TimeMs::new),
            })
        })
        .transpose()
    }

    /// Eligibility scan: every active position with its paid-period count,
    /// computed in one pass over the distribution records (not one query per
    /// position). Ordered by creation time ascending so payout order is
    /// deterministic.
    ///
    /// # Errors
    /// Returns an error if the query fails. A scan failure is fatal to a run:
    /// nothing has been mutated yet.
    pub async fn scan_active_positions(&self) -> Result<Vec<ScannedPosition>, StoreError> {
        self.query_positions_with_paid_counts(None, Some(PositionStatus::Active))
            .await
    }

    /// Positions with paid-period counts, optionally filtered by user and
    /// status. Backs both the eligibility scan and the admin read model.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_positions_with_paid_counts(
        &self,
        user_id: Option<&UserId>,
        status: Option<PositionStatus>,
    ) -> Result<Vec<ScannedPosition>, StoreError> {
        let mut sql = String::from(
            r#"
            SELECT p.id, p.user_id, p.kind, p.principal, p.rate, p.period_count,
                   p.start_time_ms, p.status, p.accumulated_profit, p.created_at_ms,
                   p.completed_at_ms, COUNT(dr.id) AS paid_periods
            FROM positions p
            LEFT JOIN distribution_records dr ON dr.position_id = p.id
            "#,
        );

        let mut clauses: Vec<&str> = Vec::new();
        if user_id.is_some() {
            clauses.push("p.user_id = ?");
        }
        if status.is_some() {
            clauses.push("p.status = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" GROUP BY p.id ORDER BY p.created_at_ms ASC, p.id ASC");

        let mut query = sqlx::query(&sql);
        if let Some(user_id) = user_id {
            query = query.bind(user_id.as_str());
        }
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(self.pool()).await?;
        Ok(rows
            .into_iter()
            .map(|row| ScannedPosition {
                id: row.get("id"),
                user_id: row.get("user_id"),
                kind: row.get("kind"),
                principal: row.get("principal"),
                rate: row.get("rate"),
                period_count: row.get("period_count"),
                start_time_ms: row.get("start_time_ms"),
                status: row.get("status"),
                accumulated_profit: row.get("accumulated_profit"),
                created_at_ms: row.get("created_at_ms"),
                completed_at_ms: row.get::<Option<i64>, _>("completed_at_ms"),
                paid_periods: row.get("paid_periods"),
            })
            .collect())
    }
}
