use bigdecimal::BigDecimal;
use serde::Serialize;

/// Deviation and recommended trade for one individual allocation.
///
/// Money fields are in the reporting currency. A positive `suggested_amount`
/// means buy, a negative one means sell.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationSuggestion {
    pub asset_id: Option<uuid::Uuid>,
    pub asset_name: String,
    pub ticker: Option<String>,
    pub alias: Option<String>,
    pub current_value: BigDecimal,
    pub current_percentage: f64,
    pub target_percentage: f64,
    pub difference_percentage: f64,
    pub target_value: BigDecimal,
    pub suggested_amount: BigDecimal,
    pub suggested_quantity: Option<BigDecimal>,
    pub is_matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupItemDetail {
    pub asset_id: Option<uuid::Uuid>,
    pub asset_name: Option<String>,
    pub ticker: Option<String>,
    pub alias: Option<String>,
    pub current_value: BigDecimal,
    pub is_matched: bool,
}

/// One suggestion for a whole group; members carry no target of their own.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSuggestion {
    pub group_id: uuid::Uuid,
    pub group_name: String,
    pub target_percentage: f64,
    pub current_percentage: f64,
    pub difference_percentage: f64,
    pub current_value: BigDecimal,
    pub target_value: BigDecimal,
    pub suggested_amount: BigDecimal,
    pub items: Vec<GroupItemDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanCalculation {
    pub plan_id: uuid::Uuid,
    pub plan_name: String,
    pub total_value: BigDecimal,
    pub suggestions: Vec<AllocationSuggestion>,
    pub group_suggestions: Vec<GroupSuggestion>,
}

/// A plan target annotated with what the portfolio holds against it.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationWithValue {
    #[serde(flatten)]
    pub allocation: super::PlanAllocation,
    pub current_value: BigDecimal,
    pub current_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_asset_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupWithValue {
    #[serde(flatten)]
    pub group: super::GroupWithItems,
    pub current_value: BigDecimal,
    pub current_percentage: f64,
}

/// The main plan itself, its targets carrying current values.
#[derive(Debug, Clone, Serialize)]
pub struct MainPlanResponse {
    #[serde(flatten)]
    pub plan: super::RebalancePlan,
    pub allocations: Vec<AllocationWithValue>,
    pub groups: Vec<GroupWithValue>,
}
