//! End-to-end engine scenarios driven through the orchestrator.

use paystream::db::init_db;
use paystream::orchestration::Orchestrator;
use paystream::{
    Decimal, LedgerEntryKind, Position, PositionKind, PositionStatus, Repository, TimeMs, UserId,
};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

const DAY: i64 = 86_400_000;

async fn setup() -> (Orchestrator, Arc<Repository>, sqlx::SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool.clone()));
    (Orchestrator::new(repo.clone()), repo, pool, temp_dir)
}

fn investment(user: &str, principal: &str, rate: &str, period_count: i64) -> Position {
    Position::new(
        UserId::new(user),
        PositionKind::Investment,
        Decimal::from_str(principal).unwrap(),
        Decimal::from_str(rate).unwrap(),
        period_count,
        TimeMs::new(0),
        TimeMs::new(0),
    )
    .unwrap()
}

#[tokio::test]
async fn test_catch_up_after_downtime_pays_all_missing_periods() {
    let (orchestrator, repo, _pool, _temp) = setup().await;
    let position = investment("user-1", "1000", "0.015", 30);
    repo.insert_position(&position).await.unwrap();

    // First run five days after creation: all five periods backfilled at once.
    let report = orchestrator.run(TimeMs::new(5 * DAY), "test").await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.periods_paid, 5);

    let records = repo.list_distributions(&position.id).await.unwrap();
    assert_eq!(records.len(), 5);
    for record in &records {
        assert_eq!(record.profit_amount.to_canonical_string(), "15");
        assert_eq!(record.principal.to_canonical_string(), "1000");
    }

    let balance = repo.get_balance(&position.user_id).await.unwrap();
    assert_eq!(balance.to_canonical_string(), "75");
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let (orchestrator, repo, _pool, _temp) = setup().await;
    let position = investment("user-1", "1000", "0.015", 30);
    repo.insert_position(&position).await.unwrap();

    let now = TimeMs::new(5 * DAY);
    orchestrator.run(now, "first").await.unwrap();
    let before = repo.count_distribution_records().await.unwrap();

    // No time passes between runs: the second run must create nothing.
    let report = orchestrator.run(now, "second").await.unwrap();
    assert_eq!(report.periods_paid, 0);
    assert_eq!(report.errored, 0);
    assert_eq!(repo.count_distribution_records().await.unwrap(), before);

    let balance = repo.get_balance(&position.user_id).await.unwrap();
    assert_eq!(balance.to_canonical_string(), "75");
}

#[tokio::test]
async fn test_thirty_day_lifecycle_totals() {
    let (orchestrator, repo, _pool, _temp) = setup().await;
    let position = investment("user-1", "1000", "0.015", 30);
    repo.insert_position(&position).await.unwrap();

    // Day 1: exactly one period paid.
    let report = orchestrator.run(TimeMs::new(DAY), "day-1").await.unwrap();
    assert_eq!(report.periods_paid, 1);
    let balance = repo.get_balance(&position.user_id).await.unwrap();
    assert_eq!(balance.to_canonical_string(), "15");

    // One run 30+ periods later settles the rest and completes the position.
    let report = orchestrator
        .run(TimeMs::new(35 * DAY), "late")
        .await
        .unwrap();
    assert_eq!(report.periods_paid, 29);
    assert_eq!(report.completed, 1);

    let records = repo.list_distributions(&position.id).await.unwrap();
    assert_eq!(records.len(), 30);

    // 30 x 15.00 profit + 1000.00 principal back.
    let balance = repo.get_balance(&position.user_id).await.unwrap();
    assert_eq!(balance.to_canonical_string(), "1450");

    let stored = repo.get_position(&position.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PositionStatus::Completed);

    let entries = repo.list_ledger_entries(&position.user_id).await.unwrap();
    let returns = entries
        .iter()
        .filter(|e| e.kind == LedgerEntryKind::CapitalReturn)
        .count();
    assert_eq!(returns, 1);

    // Completed positions are never revisited.
    let report = orchestrator
        .run(TimeMs::new(60 * DAY), "after")
        .await
        .unwrap();
    assert_eq!(report.processed, 0);
    let entries = repo.list_ledger_entries(&position.user_id).await.unwrap();
    let returns = entries
        .iter()
        .filter(|e| e.kind == LedgerEntryKind::CapitalReturn)
        .count();
    assert_eq!(returns, 1);
}

#[tokio::test]
async fn test_partial_failure_isolation() {
    let (orchestrator, repo, pool, _temp) = setup().await;
    let broken = investment("user-a", "1000", "0.015", 30);
    let healthy = investment("user-b", "2000", "0.01", 30);
    repo.insert_position(&broken).await.unwrap();
    repo.insert_position(&healthy).await.unwrap();

    // Corrupt user-a's stored balance so the payout transaction fails for
    // reasons unrelated to duplicate-period detection.
    sqlx::query("INSERT INTO balances (user_id, total_balance) VALUES ('user-a', 'garbage')")
        .execute(&pool)
        .await
        .unwrap();

    let report = orchestrator.run(TimeMs::new(3 * DAY), "test").await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.errored, 1);
    assert!(report
        .details
        .iter()
        .any(|d| d.contains(broken.id.as_str()) && d.contains("error")));

    // The healthy position is fully caught up and its records are present.
    let records = repo.list_distributions(&healthy.id).await.unwrap();
    assert_eq!(records.len(), 3);
    let balance = repo.get_balance(&healthy.user_id).await.unwrap();
    assert_eq!(balance.to_canonical_string(), "60");
}

#[tokio::test]
async fn test_mixed_daily_and_hourly_positions() {
    let (orchestrator, repo, _pool, _temp) = setup().await;
    let daily = investment("user-1", "1000", "0.015", 30);
    let hourly = Position::new(
        UserId::new("user-2"),
        PositionKind::LiveTrade,
        Decimal::from_str("500").unwrap(),
        Decimal::from_str("0.02").unwrap(),
        48,
        TimeMs::new(0),
        TimeMs::new(0),
    )
    .unwrap();
    repo.insert_position(&daily).await.unwrap();
    repo.insert_position(&hourly).await.unwrap();

    // One day in: the investment owes 1 period, the live trade 24.
    let report = orchestrator.run(TimeMs::new(DAY), "test").await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.periods_paid, 25);

    assert_eq!(
        repo.list_distributions(&daily.id).await.unwrap().len(),
        1
    );
    assert_eq!(
        repo.list_distributions(&hourly.id).await.unwrap().len(),
        24
    );
}
