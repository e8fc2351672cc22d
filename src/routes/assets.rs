use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::get;
use http::StatusCode;
use serde::Deserialize;
use tracing::{info, error};
use uuid::Uuid;

use crate::services;
use crate::errors::AppError;
use crate::models::{Asset, CreateAsset, EnrichedAsset, TickerValidation, UpdateAsset};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assets).post(create_asset))
        .route("/validate-ticker/:ticker", get(validate_ticker))
        .route("/:id", get(get_asset).put(update_asset).delete(delete_asset))
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetListQuery {
    pub portfolio_id: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteAssetQuery {
    #[serde(default)]
    pub hard_delete: bool,
}

pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<AssetListQuery>,
) -> Result<Json<Vec<EnrichedAsset>>, AppError> {
    info!("GET /assets - Listing assets (portfolio: {:?})", query.portfolio_id);
    let assets = services::asset_service::fetch_enriched(
        state.store(),
        &state.finance,
        query.portfolio_id,
        query.include_inactive,
    )
    .await
    .map_err(|e| {
        error!("Failed to list assets: {}", e);
        e
    })?;
    Ok(Json(assets))
}

pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrichedAsset>, AppError> {
    info!("GET /assets/{} - Fetching asset", id);
    let asset = services::asset_service::fetch_one_enriched(state.store(), &state.finance, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch asset {}: {}", id, e);
            e
        })?;
    Ok(Json(asset))
}

pub async fn create_asset(
    State(state): State<AppState>,
    Json(data): Json<CreateAsset>,
) -> Result<(StatusCode, Json<Asset>), AppError> {
    info!("POST /assets - Creating asset {}", data.name);
    let asset = services::asset_service::create(state.store(), &state.finance, data, state.reporting_currency())
        .await
        .map_err(|e| {
            error!("Failed to create asset: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn update_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateAsset>,
) -> Result<Json<Asset>, AppError> {
    info!("PUT /assets/{} - Updating asset", id);
    let asset = services::asset_service::update(state.store(), id, data)
        .await
        .map_err(|e| {
            error!("Failed to update asset {}: {}", id, e);
            e
        })?;
    Ok(Json(asset))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteAssetQuery>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /assets/{} - Deleting asset (hard: {})", id, query.hard_delete);
    services::asset_service::delete(state.store(), id, query.hard_delete)
        .await
        .map_err(|e| {
            error!("Failed to delete asset {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn validate_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Json<TickerValidation> {
    info!("GET /assets/validate-ticker/{} - Validating ticker", ticker);
    Json(state.finance.validate_ticker(&ticker).await)
}
