use axum::extract::{Query, State};
use axum::{Json, Router};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, error};
use uuid::Uuid;

use crate::services;
use crate::errors::AppError;
use crate::models::data_transfer::{ExportData, ImportRequest, ImportResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/export", get(export_data))
        .route("/import", post(import_data))
        .route("/schema-info", get(schema_info))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub portfolio_id: Option<Uuid>,
}

pub async fn export_data(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<ExportData>, AppError> {
    info!("GET /data/export - Exporting (portfolio: {:?})", query.portfolio_id);
    let data = services::data_migration_service::export(state.store(), query.portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to export data: {}", e);
            e
        })?;
    Ok(Json(data))
}

pub async fn import_data(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportResult>, AppError> {
    info!("POST /data/import - Importing with {:?} strategy", request.merge_strategy);
    let result = services::data_migration_service::import(state.store(), request, state.reporting_currency())
        .await
        .map_err(|e| {
            error!("Failed to import data: {}", e);
            e
        })?;
    Ok(Json(result))
}

pub async fn schema_info() -> Json<Value> {
    info!("GET /data/schema-info - Describing export format");
    Json(services::data_migration_service::schema_info())
}
