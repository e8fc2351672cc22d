use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::{info, error};
use uuid::Uuid;

use crate::services;
use crate::services::dashboard_service::{Period, DEFAULT_TICKER_HISTORY_DAYS};
use crate::errors::AppError;
use crate::models::{
    AssetHistory, BenchmarkResponse, CategoryRebalanceResponse, CategoryTarget, DashboardSummary,
    ExchangeRateResponse, GoalProgress, HistoryQuery, MarketIndicatorsResponse, PerformanceMetrics,
    RebalanceAlertsResponse, TickerHistoryResponse,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/history", get(get_history))
        .route("/rebalance", post(calculate_category_rebalance))
        .route("/exchange-rate", get(get_exchange_rate))
        .route("/benchmark/:ticker", get(get_benchmark))
        .route("/ticker-history/:ticker", get(get_ticker_history))
        .route("/performance", get(get_performance))
        .route("/rebalance-alerts", get(get_rebalance_alerts))
        .route("/goal-progress", get(get_goal_progress))
        .route("/market-indicators", get(get_market_indicators))
}

#[derive(Debug, Default, Deserialize)]
pub struct PortfolioQuery {
    pub portfolio_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BenchmarkQuery {
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TickerHistoryQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    pub portfolio_id: Option<Uuid>,
    pub threshold: Option<f64>,
}

pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<DashboardSummary>, AppError> {
    info!("GET /dashboard/summary - Building summary");
    let summary = services::dashboard_service::summary(state.store(), &state.finance, query.portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to build dashboard summary: {}", e);
            e
        })?;
    Ok(Json(summary))
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<AssetHistory>>, AppError> {
    info!("GET /dashboard/history - Fetching snapshots");
    let rows = services::dashboard_service::history(state.store(), query)
        .await
        .map_err(|e| {
            error!("Failed to fetch asset history: {}", e);
            e
        })?;
    Ok(Json(rows))
}

pub async fn calculate_category_rebalance(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
    Json(targets): Json<Vec<CategoryTarget>>,
) -> Result<Json<CategoryRebalanceResponse>, AppError> {
    info!("POST /dashboard/rebalance - {} category targets", targets.len());
    let result = services::dashboard_service::category_rebalance(
        state.store(),
        &state.finance,
        query.portfolio_id,
        targets,
    )
    .await
    .map_err(|e| {
        error!("Failed to calculate category rebalance: {}", e);
        e
    })?;
    Ok(Json(result))
}

pub async fn get_exchange_rate(
    State(state): State<AppState>,
) -> Result<Json<ExchangeRateResponse>, AppError> {
    info!("GET /dashboard/exchange-rate - Fetching USD/{}", state.reporting_currency());
    let rate = services::dashboard_service::exchange_rate(&state.finance, "USD", state.reporting_currency())
        .await
        .map_err(|e| {
            error!("Failed to fetch exchange rate: {}", e);
            e
        })?;
    Ok(Json(rate))
}

pub async fn get_benchmark(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<BenchmarkQuery>,
) -> Result<Json<BenchmarkResponse>, AppError> {
    let period = match query.period.as_deref() {
        Some(raw) => Period::parse(raw)?,
        None => Period::ThreeMonths,
    };
    info!("GET /dashboard/benchmark/{} - Period {}", ticker, period.label());
    Ok(Json(services::dashboard_service::benchmark(&state.finance, &ticker, period).await))
}

pub async fn get_ticker_history(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<TickerHistoryQuery>,
) -> Result<Json<TickerHistoryResponse>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_TICKER_HISTORY_DAYS);
    if !(7..=90).contains(&days) {
        return Err(AppError::Validation("days must be between 7 and 90".into()));
    }
    info!("GET /dashboard/ticker-history/{} - Last {} days", ticker, days);
    Ok(Json(state.finance.ticker_history(&ticker, days).await))
}

pub async fn get_performance(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<PerformanceMetrics>, AppError> {
    info!("GET /dashboard/performance - Computing returns and drawdown");
    let metrics = services::dashboard_service::performance(state.store(), query.portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to compute performance: {}", e);
            e
        })?;
    Ok(Json(metrics))
}

pub async fn get_rebalance_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<RebalanceAlertsResponse>, AppError> {
    match query.threshold {
        Some(threshold) => info!("GET /dashboard/rebalance-alerts - Threshold {}", threshold),
        None => info!("GET /dashboard/rebalance-alerts - Stored threshold"),
    }
    let alerts = services::dashboard_service::rebalance_alerts(
        state.store(),
        &state.finance,
        query.portfolio_id,
        query.threshold,
    )
    .await
    .map_err(|e| {
        error!("Failed to compute rebalance alerts: {}", e);
        e
    })?;
    Ok(Json(alerts))
}

pub async fn get_goal_progress(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<GoalProgress>, AppError> {
    info!("GET /dashboard/goal-progress - Computing goal progress");
    let progress = services::dashboard_service::goal_progress(state.store(), &state.finance, query.portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to compute goal progress: {}", e);
            e
        })?;
    Ok(Json(progress))
}

pub async fn get_market_indicators(
    State(state): State<AppState>,
) -> Result<Json<MarketIndicatorsResponse>, AppError> {
    info!("GET /dashboard/market-indicators - Fetching indices and USD/KRW");
    Ok(Json(services::dashboard_service::market_indicators(&state.finance).await))
}
