use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// End-of-day totals for one portfolio, unique per (portfolio, date).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssetHistory {
    pub id: uuid::Uuid,
    pub portfolio_id: uuid::Uuid,
    pub snapshot_date: chrono::NaiveDate,
    pub total_value: BigDecimal,
    pub total_principal: BigDecimal,
    pub total_profit: BigDecimal,
    pub profit_rate: Option<f64>,
    pub category_breakdown: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAssetSnapshot {
    pub portfolio_id: uuid::Uuid,
    pub snapshot_date: chrono::NaiveDate,
    pub total_value: BigDecimal,
    pub total_principal: BigDecimal,
    pub total_profit: BigDecimal,
    pub profit_rate: f64,
    pub category_breakdown: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BenchmarkClose {
    pub ticker: String,
    pub trade_date: chrono::NaiveDate,
    pub close: BigDecimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub portfolio_id: Option<uuid::Uuid>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub limit: Option<i64>,
}
