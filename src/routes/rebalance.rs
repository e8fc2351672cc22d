use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::{get, post, put};
use http::StatusCode;
use serde::Deserialize;
use tracing::{info, error};
use uuid::Uuid;

use crate::services;
use crate::errors::AppError;
use crate::models::{
    AllocationInput, CreatePlan, GroupInput, GroupWithItems, MainPlanResponse, PlanCalculation,
    PlanDetails, RebalancePlan, UpdatePlan,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/:id", get(get_plan).put(update_plan).delete(delete_plan))
        .route("/plans/:id/allocations", put(replace_allocations))
        .route("/plans/:id/groups", get(list_groups).put(replace_groups))
        .route("/plans/:id/set-main", post(set_main_plan))
        .route("/plans/:id/calculate", post(calculate_plan))
        .route("/main-plan", get(get_main_plan))
}

#[derive(Debug, Default, Deserialize)]
pub struct PortfolioQuery {
    pub portfolio_id: Option<Uuid>,
}

pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<Vec<PlanDetails>>, AppError> {
    info!("GET /rebalance/plans - Listing plans (portfolio: {:?})", query.portfolio_id);
    let plans = services::rebalance_service::list_plans(state.store(), query.portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to list plans: {}", e);
            e
        })?;
    Ok(Json(plans))
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanDetails>, AppError> {
    info!("GET /rebalance/plans/{} - Fetching plan", id);
    let plan = services::rebalance_service::get_plan(state.store(), id)
        .await
        .map_err(|e| {
            error!("Failed to fetch plan {}: {}", id, e);
            e
        })?;
    Ok(Json(plan))
}

pub async fn create_plan(
    State(state): State<AppState>,
    Json(data): Json<CreatePlan>,
) -> Result<(StatusCode, Json<PlanDetails>), AppError> {
    info!("POST /rebalance/plans - Creating plan {}", data.name);
    let plan = services::rebalance_service::create_plan(state.store(), data, state.reporting_currency())
        .await
        .map_err(|e| {
            error!("Failed to create plan: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdatePlan>,
) -> Result<Json<RebalancePlan>, AppError> {
    info!("PUT /rebalance/plans/{} - Updating plan", id);
    let plan = services::rebalance_service::update_plan(state.store(), id, data)
        .await
        .map_err(|e| {
            error!("Failed to update plan {}: {}", id, e);
            e
        })?;
    Ok(Json(plan))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /rebalance/plans/{} - Deactivating plan", id);
    services::rebalance_service::soft_delete_plan(state.store(), id)
        .await
        .map_err(|e| {
            error!("Failed to delete plan {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn replace_allocations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<Vec<AllocationInput>>,
) -> Result<Json<PlanDetails>, AppError> {
    info!("PUT /rebalance/plans/{}/allocations - Replacing {} allocations", id, data.len());
    let plan = services::rebalance_service::replace_allocations(state.store(), id, data)
        .await
        .map_err(|e| {
            error!("Failed to replace allocations for plan {}: {}", id, e);
            e
        })?;
    Ok(Json(plan))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GroupWithItems>>, AppError> {
    info!("GET /rebalance/plans/{}/groups - Listing groups", id);
    let groups = services::rebalance_service::list_groups(state.store(), id)
        .await
        .map_err(|e| {
            error!("Failed to list groups for plan {}: {}", id, e);
            e
        })?;
    Ok(Json(groups))
}

pub async fn replace_groups(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<Vec<GroupInput>>,
) -> Result<Json<Vec<GroupWithItems>>, AppError> {
    info!("PUT /rebalance/plans/{}/groups - Replacing {} groups", id, data.len());
    let groups = services::rebalance_service::replace_groups(state.store(), id, data)
        .await
        .map_err(|e| {
            error!("Failed to replace groups for plan {}: {}", id, e);
            e
        })?;
    Ok(Json(groups))
}

pub async fn set_main_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RebalancePlan>, AppError> {
    info!("POST /rebalance/plans/{}/set-main - Setting main plan", id);
    let plan = services::rebalance_service::set_main_plan(state.store(), id)
        .await
        .map_err(|e| {
            error!("Failed to set main plan {}: {}", id, e);
            e
        })?;
    Ok(Json(plan))
}

pub async fn calculate_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<PlanCalculation>, AppError> {
    info!("POST /rebalance/plans/{}/calculate - Calculating suggestions", id);
    let calculation = services::rebalance_service::calculate_for_plan(
        state.store(),
        &state.finance,
        id,
        query.portfolio_id,
    )
    .await
    .map_err(|e| {
        error!("Failed to calculate plan {}: {}", id, e);
        e
    })?;
    Ok(Json(calculation))
}

pub async fn get_main_plan(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<Option<MainPlanResponse>>, AppError> {
    info!("GET /rebalance/main-plan - Fetching main plan");
    let main = services::rebalance_service::get_main_plan(state.store(), &state.finance, query.portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch main plan: {}", e);
            e
        })?;
    Ok(Json(main))
}
