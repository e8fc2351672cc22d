use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

pub const UNCATEGORIZED: &str = "기타";
pub const UNKNOWN_CATEGORY: &str = "알 수 없음";
pub const DEFAULT_CATEGORY_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, Serialize)]
pub struct CategoryAllocation {
    pub category_id: Option<uuid::Uuid>,
    pub category_name: String,
    pub color: String,
    pub market_value: BigDecimal,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_value: BigDecimal,
    pub total_principal: BigDecimal,
    pub total_profit: BigDecimal,
    pub profit_rate: f64,
    pub asset_count: usize,
    pub allocations: Vec<CategoryAllocation>,
    pub main_plan_id: Option<uuid::Uuid>,
    pub main_plan_name: Option<String>,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRateResponse {
    pub rate: BigDecimal,
    pub from_currency: String,
    pub to_currency: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkPoint {
    pub date: chrono::NaiveDate,
    pub close: f64,
    pub return_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResponse {
    pub ticker: String,
    pub name: String,
    pub data: Vec<BenchmarkPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickerHistoryPoint {
    pub date: chrono::NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickerHistoryResponse {
    pub ticker: String,
    pub data: Vec<TickerHistoryPoint>,
    pub change_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodReturn {
    pub period: String,
    pub return_rate: Option<f64>,
    pub start_value: Option<BigDecimal>,
    pub end_value: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetrics {
    pub period_returns: Vec<PeriodReturn>,
    pub max_drawdown: Option<f64>,
    pub max_drawdown_period: Option<String>,
    pub current_drawdown: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviationDirection {
    Over,
    Under,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalanceAlert {
    pub category_name: String,
    pub current_percentage: f64,
    pub target_percentage: f64,
    pub deviation: f64,
    pub direction: DeviationDirection,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalanceAlertsResponse {
    pub alerts: Vec<RebalanceAlert>,
    pub threshold: f64,
    pub needs_rebalancing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalProgress {
    pub target_value: BigDecimal,
    pub current_value: BigDecimal,
    pub progress_percentage: f64,
    pub remaining_amount: BigDecimal,
    pub is_achieved: bool,
}

/// Desired weight of one asset category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryTarget {
    pub category_id: uuid::Uuid,
    pub target_percentage: f64,
}

impl CategoryTarget {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.target_percentage) {
            return Err(format!(
                "target_percentage must be between 0 and 100, got {}",
                self.target_percentage
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRebalanceSuggestion {
    pub category_id: uuid::Uuid,
    pub category_name: String,
    pub current_value: BigDecimal,
    pub current_percentage: f64,
    pub target_percentage: f64,
    pub difference_percentage: f64,
    /// Positive means buy, negative means sell.
    pub suggested_amount: BigDecimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRebalanceResponse {
    pub total_value: BigDecimal,
    pub suggestions: Vec<CategoryRebalanceSuggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketIndicator {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub change_rate: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketIndicatorsResponse {
    pub indicators: Vec<MarketIndicator>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
