//! Balance and transaction-log read model for one user.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::UserId;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub user_id: String,
    pub total_balance: String,
    pub entry_count: i64,
    pub entries: Vec<LedgerEntryDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDto {
    pub kind: String,
    pub amount: String,
    pub description: String,
    pub created_at_ms: i64,
}

pub async fn get_ledger(
    Query(params): Query<LedgerQuery>,
    State(state): State<AppState>,
) -> Result<Json<LedgerResponse>, AppError> {
    if params.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("userId must not be empty".into()));
    }
    let user_id = UserId::new(params.user_id);

    let balance = state.repo.get_balance(&user_id).await?;
    let entries = state.repo.list_ledger_entries(&user_id).await?;

    let entry_count = entries.len() as i64;
    let entries = entries
        .into_iter()
        .map(|e| LedgerEntryDto {
            kind: e.kind.as_str().to_string(),
            amount: e.amount.to_canonical_string(),
            description: e.description,
            created_at_ms: e.created_at_ms.as_ms(),
        })
        .collect();

    Ok(Json(LedgerResponse {
        user_id: user_id.as_str().to_string(),
        total_balance: balance.to_canonical_string(),
        entry_count,
        entries,
    }))
}
