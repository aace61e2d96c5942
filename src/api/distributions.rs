//! Trigger endpoint: start a distribution run now.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::TimeMs;
use crate::error::AppError;
use crate::orchestration::RunReport;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Caller label, for audit only (e.g. "scheduler", "admin").
    pub trigger: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub processed_count: usize,
    pub error_count: usize,
    pub completed_count: usize,
    pub periods_paid: usize,
    pub message: String,
    pub details: Vec<String>,
}

impl From<RunReport> for RunResponse {
    fn from(report: RunReport) -> Self {
        RunResponse {
            processed_count: report.processed,
            error_count: report.errored,
            completed_count: report.completed,
            periods_paid: report.periods_paid,
            message: report.message,
            details: report.details,
        }
    }
}

pub async fn run_now(
    State(state): State<AppState>,
    body: Option<Json<RunRequest>>,
) -> Result<Json<RunResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let trigger = request.trigger.as_deref().unwrap_or("manual");

    let report = state.orchestrator.run(TimeMs::now(), trigger).await?;
    Ok(Json(report.into()))
}
