use axum::extract::State;
use axum::{Json, Router};
use axum::routing::get;
use tracing::{info, error};

use crate::services;
use crate::errors::AppError;
use crate::models::{UpdateUserSettings, UserSettings};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<UserSettings>, AppError> {
    info!("GET /settings - Fetching user settings");
    let settings = services::settings_service::fetch(state.store())
        .await
        .map_err(|e| {
            error!("Failed to fetch settings: {}", e);
            e
        })?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(data): Json<UpdateUserSettings>,
) -> Result<Json<UserSettings>, AppError> {
    info!("PUT /settings - Updating user settings");
    let settings = services::settings_service::update(state.store(), data)
        .await
        .map_err(|e| {
            error!("Failed to update settings: {}", e);
            e
        })?;
    Ok(Json(settings))
}
