use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "1.0.0";

// Export rows reference their parents by name so a file can be loaded into a
// database with different ids.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPortfolio {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "super::portfolio::default_currency")]
    pub base_currency: String,
    pub target_value: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedAsset {
    pub name: String,
    pub ticker: Option<String>,
    #[serde(default = "default_asset_type")]
    pub asset_type: String,
    #[serde(default)]
    pub quantity: BigDecimal,
    #[serde(default)]
    pub average_price: BigDecimal,
    #[serde(default = "super::portfolio::default_currency")]
    pub currency: String,
    pub current_value: Option<BigDecimal>,
    pub purchase_exchange_rate: Option<BigDecimal>,
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "_portfolio_name")]
    pub portfolio_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPlan {
    pub name: String,
    pub description: Option<String>,
    pub strategy_prompt: Option<String>,
    #[serde(default)]
    pub is_main: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "_portfolio_name")]
    pub portfolio_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedAllocation {
    pub ticker: Option<String>,
    pub alias: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub target_percentage: BigDecimal,
    #[serde(rename = "_plan_name")]
    pub plan_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedGroupItem {
    pub ticker: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedGroup {
    pub name: String,
    #[serde(default)]
    pub target_percentage: BigDecimal,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub items: Vec<ExportedGroupItem>,
    #[serde(rename = "_plan_name")]
    pub plan_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub schema_version: String,
    #[serde(default)]
    pub export_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub portfolios: Vec<ExportedPortfolio>,
    #[serde(default)]
    pub assets: Vec<ExportedAsset>,
    #[serde(default)]
    pub rebalance_plans: Vec<ExportedPlan>,
    #[serde(default)]
    pub plan_allocations: Vec<ExportedAllocation>,
    #[serde(default)]
    pub allocation_groups: Vec<ExportedGroup>,
}

impl ExportData {
    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
            && self.assets.is_empty()
            && self.rebalance_plans.is_empty()
            && self.plan_allocations.is_empty()
            && self.allocation_groups.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    #[default]
    Replace,
    Merge,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub data: serde_json::Value,
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub portfolios_created: u32,
    pub portfolios_updated: u32,
    pub assets_created: u32,
    pub plans_created: u32,
    pub allocations_created: u32,
    pub groups_created: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub success: bool,
    pub message: String,
    pub stats: ImportStats,
}

fn default_asset_type() -> String {
    "stock".to_string()
}

fn default_true() -> bool {
    true
}
