use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::asset::non_empty;

// A named set of target allocations for one portfolio. At most one plan per
// portfolio carries `is_main`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RebalancePlan {
    pub id: uuid::Uuid,
    pub portfolio_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub strategy_prompt: Option<String>,
    pub is_main: bool,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// One individual target. The asset is soft-referenced by id, ticker or alias
// and the reference may dangle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanAllocation {
    pub id: uuid::Uuid,
    pub plan_id: uuid::Uuid,
    pub asset_id: Option<uuid::Uuid>,
    pub ticker: Option<String>,
    pub alias: Option<String>,
    pub display_name: Option<String>,
    pub target_percentage: BigDecimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AllocationGroup {
    pub id: uuid::Uuid,
    pub plan_id: uuid::Uuid,
    pub name: String,
    pub target_percentage: BigDecimal,
    pub display_order: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AllocationGroupItem {
    pub id: uuid::Uuid,
    pub group_id: uuid::Uuid,
    pub asset_id: Option<uuid::Uuid>,
    pub ticker: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupWithItems {
    #[serde(flatten)]
    pub group: AllocationGroup,
    pub items: Vec<AllocationGroupItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDetails {
    #[serde(flatten)]
    pub plan: RebalancePlan,
    pub allocations: Vec<PlanAllocation>,
    pub groups: Vec<GroupWithItems>,
}

#[derive(Debug, Clone)]
pub struct NewPlan {
    pub portfolio_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub strategy_prompt: Option<String>,
    pub is_main: bool,
    pub is_active: bool,
}

impl RebalancePlan {
    pub(crate) fn new(input: NewPlan) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            portfolio_id: input.portfolio_id,
            name: input.name,
            description: input.description,
            strategy_prompt: input.strategy_prompt,
            is_main: input.is_main,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn apply(&mut self, changes: &UpdatePlan) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if changes.description.is_some() {
            self.description = changes.description.clone();
        }
        if changes.strategy_prompt.is_some() {
            self.strategy_prompt = changes.strategy_prompt.clone();
        }
        if let Some(is_main) = changes.is_main {
            self.is_main = is_main;
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
        self.updated_at = chrono::Utc::now();
    }
}

impl PlanAllocation {
    pub(crate) fn new(plan_id: uuid::Uuid, input: &AllocationInput) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            plan_id,
            asset_id: input.asset_id,
            ticker: input.ticker.clone(),
            alias: input.alias.clone(),
            display_name: input.display_name.clone(),
            target_percentage: input.target_percentage.clone(),
            created_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlan {
    pub portfolio_id: Option<uuid::Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub strategy_prompt: Option<String>,
    #[serde(default)]
    pub is_main: bool,
    #[serde(default)]
    pub allocations: Vec<AllocationInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub name: Option<String>,
    pub description: Option<String>,
    pub strategy_prompt: Option<String>,
    pub is_main: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationInput {
    pub asset_id: Option<uuid::Uuid>,
    pub ticker: Option<String>,
    pub alias: Option<String>,
    pub display_name: Option<String>,
    pub target_percentage: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupItemInput {
    pub asset_id: Option<uuid::Uuid>,
    pub ticker: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInput {
    pub name: String,
    pub target_percentage: BigDecimal,
    pub display_order: Option<i32>,
    #[serde(default)]
    pub items: Vec<GroupItemInput>,
}

fn validate_percentage(value: &BigDecimal) -> Result<(), String> {
    if *value < BigDecimal::from(0) || *value > BigDecimal::from(100) {
        return Err(format!("Target percentage must be between 0 and 100, got {}", value));
    }
    Ok(())
}

fn validate_plan_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Plan name cannot be empty".into());
    }
    Ok(())
}

impl CreatePlan {
    pub fn validate(&self) -> Result<(), String> {
        validate_plan_name(&self.name)?;
        self.allocations.iter().try_for_each(AllocationInput::validate)
    }
}

impl UpdatePlan {
    pub fn validate(&self) -> Result<(), String> {
        match &self.name {
            Some(name) => validate_plan_name(name),
            None => Ok(()),
        }
    }
}

impl AllocationInput {
    pub fn validate(&self) -> Result<(), String> {
        validate_percentage(&self.target_percentage)
    }

    /// Blank descriptor fields are stored as absent.
    pub fn sanitized(self) -> Self {
        Self {
            asset_id: self.asset_id,
            ticker: non_empty(self.ticker),
            alias: non_empty(self.alias),
            display_name: non_empty(self.display_name),
            target_percentage: self.target_percentage,
        }
    }
}

impl GroupItemInput {
    pub fn sanitized(self) -> Self {
        Self {
            asset_id: self.asset_id,
            ticker: non_empty(self.ticker),
            alias: non_empty(self.alias),
        }
    }
}

impl GroupInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Group name cannot be empty".into());
        }
        validate_percentage(&self.target_percentage)
    }

    pub fn sanitized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            target_percentage: self.target_percentage,
            display_order: self.display_order,
            items: self.items.into_iter().map(GroupItemInput::sanitized).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn allocation(pct: &str) -> AllocationInput {
        AllocationInput {
            asset_id: None,
            ticker: Some("  ".into()),
            alias: Some(" bonds ".into()),
            display_name: None,
            target_percentage: BigDecimal::from_str(pct).unwrap(),
        }
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(allocation("0").validate().is_ok());
        assert!(allocation("100").validate().is_ok());
        assert!(allocation("100.01").validate().is_err());
        assert!(allocation("-1").validate().is_err());
    }

    #[test]
    fn test_sanitized_drops_blank_fields() {
        let input = allocation("10").sanitized();
        assert_eq!(input.ticker, None);
        assert_eq!(input.alias.as_deref(), Some("bonds"));
    }

    #[test]
    fn test_group_requires_name() {
        let group = GroupInput {
            name: " ".into(),
            target_percentage: BigDecimal::from(30),
            display_order: None,
            items: vec![],
        };
        assert!(group.validate().is_err());
    }
}
