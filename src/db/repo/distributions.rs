//! Distribution record reads.
//!
//! Records are only ever written inside the payout transaction in `mod.rs`;
//! this file is the read surface.

use crate::domain::{DistributionRecord, PositionId, TimeMs, UserId};
use sqlx::Row;
use std::collections::BTreeSet;

use super::{parse_decimal, Repository, StoreError};

impl Repository {
    /// Period keys already recorded for a position, as a set for the
    /// reconciler to diff against.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_period_keys(
        &self,
        position_id: &PositionId,
    ) -> Result<BTreeSet<i64>, StoreError> {
        let rows = sqlx::query(
            "SELECT period_key_ms FROM distribution_records WHERE position_id = ?",
        )
        .bind(position_id.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<i64, _>("period_key_ms"))
            .collect())
    }

    /// Distribution records for a position, in period order.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored value is corrupt.
    pub async fn list_distributions(
        &self,
        position_id: &PositionId,
    ) -> Result<Vec<DistributionRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, position_id, user_id, period_key_ms, principal, profit_amount, created_at_ms
            FROM distribution_records
            WHERE position_id = ?
            ORDER BY period_key_ms ASC
            "#,
        )
        .bind(position_id.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                let id: i64 = row.get("id");
                Ok(DistributionRecord {
                    id,
                    position_id: PositionId::new(row.get::<String, _>("position_id")),
                    user_id: UserId::new(row.get::<String, _>("user_id")),
                    period_key_ms: TimeMs::new(row.get("period_key_ms")),
                    principal: parse_decimal(
                        "distribution_record",
                        &id.to_string(),
                        "principal",
                        &row.get::<String, _>("principal"),
                    )?,
                    profit_amount: parse_decimal(
                        "distribution_record",
                        &id.to_string(),
                        "profit_amount",
                        &row.get::<String, _>("profit_amount"),
                    )?,
                    created_at_ms: TimeMs::new(row.get("created_at_ms")),
                })
            })
            .collect()
    }

    /// Total number of distribution records across all positions.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn count_distribution_records(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM distribution_records")
            .fetch_one(self.pool())
            .await?;
        Ok(row.get("n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{Decimal, Position, PositionKind};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_list_period_keys_and_records() {
        let (repo, _temp) = setup_test_db().await;
        let position = Position::new(
            UserId::new("user-1"),
            PositionKind::LiveTrade,
            Decimal::from_str("500").unwrap(),
            Decimal::from_str("0.02").unwrap(),
            10,
            TimeMs::new(0),
            TimeMs::new(0),
        )
        .unwrap();
        repo.insert_position(&position).await.unwrap();

        for n in [1i64, 3] {
            repo.record_period_payout(
                &position,
                TimeMs::new(n * 3_600_000),
                position.profit_per_period(),
                "profit",
                TimeMs::new(10_000_000),
            )
            .await
            .unwrap();
        }

        let keys = repo.list_period_keys(&position.id).await.unwrap();
        let expected: BTreeSet<i64> = [3_600_000, 10_800_000].into_iter().collect();
        assert_eq!(keys, expected);

        let records = repo.list_distributions(&position.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].period_key_ms, TimeMs::new(3_600_000));
        assert_eq!(records[0].profit_amount.to_canonical_string(), "10");
        assert_eq!(records[0].principal.to_canonical_string(), "500");

        assert_eq!(repo.count_distribution_records().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_position_has_no_keys() {
        let (repo, _temp) = setup_test_db().await;
        let keys = repo
            .list_period_keys(&PositionId::new("nope"))
            .await
            .unwrap();
        assert!(keys.is_empty());
        assert_eq!(repo.count_distribution_records().await.unwrap(), 0);
    }
}
