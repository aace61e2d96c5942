//! Eligibility read model: active positions and projected payouts.
//!
//! Consumed by the admin UI; read-only. Projections use the same period
//! arithmetic as the engine so what the UI shows is what the next run pays.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{PositionStatus, TimeMs, UserId};
use crate::engine::period::{PeriodSchedule, PeriodUnit};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsQuery {
    pub user_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub position_count: i64,
    pub positions: Vec<PositionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub principal: String,
    pub rate: String,
    pub period_count: i64,
    pub start_time_ms: i64,
    pub status: String,
    pub accumulated_profit: String,
    pub paid_periods: i64,
    pub elapsed_periods: i64,
    /// Periods the next run would pay for this position.
    pub pending_periods: i64,
    pub profit_per_period: String,
    /// Scheduled timestamp of the next unpaid period, when one is due.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_period_at_ms: Option<i64>,
}

pub async fn get_positions(
    Query(params): Query<PositionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, AppError> {
    let user_id = params.user_id.map(UserId::new);
    let status = params
        .status
        .as_deref()
        .map(|s| {
            PositionStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid status {:?}", s)))
        })
        .transpose()?;

    let rows = state
        .repo
        .query_positions_with_paid_counts(user_id.as_ref(), status)
        .await?;

    let now = TimeMs::now();
    let mut positions = Vec::with_capacity(rows.len());
    for row in &rows {
        let position = row.parse()?;
        let unit = PeriodUnit::for_kind(position.kind);
        let schedule =
            PeriodSchedule::compute(position.start_time_ms, now, unit, position.period_count);
        let pending = (schedule.payable - row.paid_periods).max(0);

        positions.push(PositionDto {
            id: position.id.as_str().to_string(),
            user_id: position.user_id.as_str().to_string(),
            kind: position.kind.as_str().to_string(),
            principal: position.principal.to_canonical_string(),
            rate: position.rate.to_canonical_string(),
            period_count: position.period_count,
            start_time_ms: position.start_time_ms.as_ms(),
            status: position.status.as_str().to_string(),
            accumulated_profit: position.accumulated_profit.to_canonical_string(),
            paid_periods: row.paid_periods,
            elapsed_periods: schedule.elapsed,
            pending_periods: pending,
            profit_per_period: position.profit_per_period().to_canonical_string(),
            next_period_at_ms: (row.paid_periods < position.period_count)
                .then(|| schedule.key_for(row.paid_periods + 1).as_ms()),
        });
    }

    Ok(Json(PositionsResponse {
        position_count: positions.len() as i64,
        positions,
    }))
}
