use std::sync::Arc;

use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::jobs::daily_snapshot_job;
use crate::services::job_scheduler_service::{execute_job_with_tracking, JobContext};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/snapshot", post(run_snapshot))
}

#[derive(Serialize)]
struct JobRunResponse {
    job_name: &'static str,
    items_processed: i32,
    items_failed: i32,
}

/// POST /api/v1/jobs/snapshot - Record today's snapshots now
async fn run_snapshot(
    State(state): State<AppState>,
) -> Result<Json<JobRunResponse>, AppError> {
    info!("POST /jobs/snapshot - Running daily snapshot on demand");
    let context = JobContext {
        store: state.store.clone(),
        finance: state.finance.clone(),
        settings: state.settings.clone(),
    };

    let result = execute_job_with_tracking(
        "daily_snapshot",
        context,
        Arc::new(daily_snapshot_job::record_daily_snapshots),
    )
    .await
    .ok_or_else(|| AppError::External("Daily snapshot job failed".to_string()))?;

    Ok(Json(JobRunResponse {
        job_name: "daily_snapshot",
        items_processed: result.items_processed,
        items_failed: result.items_failed,
    }))
}
