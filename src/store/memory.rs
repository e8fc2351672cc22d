use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    Asset, AssetHistory, BenchmarkClose, GroupWithItems, NewAssetSnapshot, PlanAllocation,
    Portfolio, RebalancePlan, UpdatePortfolio, UpdateUserSettings, UserSettings,
};
use crate::store::{AssetRepository, PlanRepository, SettingsRepository};

#[derive(Default)]
struct Tables {
    portfolios: Vec<Portfolio>,
    assets: Vec<Asset>,
    plans: Vec<RebalancePlan>,
    allocations: Vec<PlanAllocation>,
    groups: Vec<GroupWithItems>,
    history: Vec<AssetHistory>,
    benchmarks: Vec<BenchmarkClose>,
    user_settings: Vec<UserSettings>,
}

/// In-process store for tests and database-less local runs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn benchmark_closes(&self, ticker: &str) -> Vec<BenchmarkClose> {
        self.tables
            .read()
            .benchmarks
            .iter()
            .filter(|b| b.ticker == ticker)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AssetRepository for MemoryStore {
    async fn list_portfolios(&self) -> Result<Vec<Portfolio>, AppError> {
        Ok(self.tables.read().portfolios.clone())
    }

    async fn get_portfolio(&self, id: Uuid) -> Result<Option<Portfolio>, AppError> {
        Ok(self.tables.read().portfolios.iter().find(|p| p.id == id).cloned())
    }

    async fn find_portfolio_by_name(&self, name: &str) -> Result<Option<Portfolio>, AppError> {
        Ok(self.tables.read().portfolios.iter().find(|p| p.name == name).cloned())
    }

    async fn insert_portfolio(&self, portfolio: Portfolio) -> Result<Portfolio, AppError> {
        self.tables.write().portfolios.push(portfolio.clone());
        Ok(portfolio)
    }

    async fn update_portfolio(&self, id: Uuid, changes: UpdatePortfolio) -> Result<Option<Portfolio>, AppError> {
        let mut tables = self.tables.write();
        let Some(portfolio) = tables.portfolios.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            portfolio.name = name;
        }
        if changes.description.is_some() {
            portfolio.description = changes.description;
        }
        if let Some(currency) = changes.base_currency {
            portfolio.base_currency = currency;
        }
        if changes.target_value.is_some() {
            portfolio.target_value = changes.target_value;
        }
        Ok(Some(portfolio.clone()))
    }

    async fn delete_portfolio(&self, id: Uuid) -> Result<u64, AppError> {
        let mut tables = self.tables.write();
        let before = tables.portfolios.len();
        tables.portfolios.retain(|p| p.id != id);
        if tables.portfolios.len() == before {
            return Ok(0);
        }

        let plan_ids: Vec<Uuid> = tables.plans.iter().filter(|p| p.portfolio_id == id).map(|p| p.id).collect();
        tables.allocations.retain(|a| !plan_ids.contains(&a.plan_id));
        tables.groups.retain(|g| !plan_ids.contains(&g.group.plan_id));
        tables.plans.retain(|p| p.portfolio_id != id);
        tables.assets.retain(|a| a.portfolio_id != id);
        tables.history.retain(|h| h.portfolio_id != id);
        Ok(1)
    }

    async fn list_assets(&self, portfolio_id: Uuid, include_inactive: bool) -> Result<Vec<Asset>, AppError> {
        Ok(self
            .tables
            .read()
            .assets
            .iter()
            .filter(|a| a.portfolio_id == portfolio_id && (include_inactive || a.is_active))
            .cloned()
            .collect())
    }

    async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        Ok(self.tables.read().assets.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_asset(&self, asset: Asset) -> Result<Asset, AppError> {
        self.tables.write().assets.push(asset.clone());
        Ok(asset)
    }

    async fn update_asset(&self, asset: Asset) -> Result<Option<Asset>, AppError> {
        let mut tables = self.tables.write();
        match tables.assets.iter_mut().find(|a| a.id == asset.id) {
            Some(existing) => {
                *existing = asset.clone();
                Ok(Some(asset))
            }
            None => Ok(None),
        }
    }

    async fn delete_asset(&self, id: Uuid) -> Result<u64, AppError> {
        let mut tables = self.tables.write();
        let before = tables.assets.len();
        tables.assets.retain(|a| a.id != id);
        Ok((before - tables.assets.len()) as u64)
    }

    async fn upsert_snapshot(&self, snapshot: NewAssetSnapshot) -> Result<AssetHistory, AppError> {
        let mut tables = self.tables.write();
        let existing = tables
            .history
            .iter()
            .position(|h| h.portfolio_id == snapshot.portfolio_id && h.snapshot_date == snapshot.snapshot_date);

        let row = AssetHistory {
            id: existing.map(|i| tables.history[i].id).unwrap_or_else(Uuid::new_v4),
            portfolio_id: snapshot.portfolio_id,
            snapshot_date: snapshot.snapshot_date,
            total_value: snapshot.total_value,
            total_principal: snapshot.total_principal,
            total_profit: snapshot.total_profit,
            profit_rate: Some(snapshot.profit_rate),
            category_breakdown: Some(snapshot.category_breakdown),
            created_at: Utc::now(),
        };

        match existing {
            Some(i) => tables.history[i] = row.clone(),
            None => tables.history.push(row.clone()),
        }
        Ok(row)
    }

    async fn list_history(
        &self,
        portfolio_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: i64,
    ) -> Result<Vec<AssetHistory>, AppError> {
        let tables = self.tables.read();
        let mut rows: Vec<AssetHistory> = tables
            .history
            .iter()
            .filter(|h| h.portfolio_id == portfolio_id)
            .filter(|h| start.map_or(true, |s| h.snapshot_date >= s))
            .filter(|h| end.map_or(true, |e| h.snapshot_date <= e))
            .cloned()
            .collect();
        rows.sort_by_key(|h| h.snapshot_date);

        let keep = limit.max(0) as usize;
        if rows.len() > keep {
            rows.drain(..rows.len() - keep);
        }
        Ok(rows)
    }

    async fn upsert_benchmark_close(&self, ticker: &str, date: NaiveDate, close: BigDecimal) -> Result<(), AppError> {
        let mut tables = self.tables.write();
        tables.benchmarks.retain(|b| !(b.ticker == ticker && b.trade_date == date));
        tables.benchmarks.push(BenchmarkClose { ticker: ticker.to_string(), trade_date: date, close });
        Ok(())
    }
}

#[async_trait]
impl PlanRepository for MemoryStore {
    async fn list_plans(&self, portfolio_id: Option<Uuid>, include_inactive: bool) -> Result<Vec<RebalancePlan>, AppError> {
        Ok(self
            .tables
            .read()
            .plans
            .iter()
            .rev()
            .filter(|p| portfolio_id.map_or(true, |id| p.portfolio_id == id))
            .filter(|p| include_inactive || p.is_active)
            .cloned()
            .collect())
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<RebalancePlan>, AppError> {
        Ok(self.tables.read().plans.iter().find(|p| p.id == id).cloned())
    }

    async fn find_main_plan(&self, portfolio_id: Uuid) -> Result<Option<RebalancePlan>, AppError> {
        Ok(self
            .tables
            .read()
            .plans
            .iter()
            .find(|p| p.portfolio_id == portfolio_id && p.is_main && p.is_active)
            .cloned())
    }

    async fn insert_plan(&self, plan: RebalancePlan) -> Result<RebalancePlan, AppError> {
        self.tables.write().plans.push(plan.clone());
        Ok(plan)
    }

    async fn update_plan(&self, plan: RebalancePlan) -> Result<Option<RebalancePlan>, AppError> {
        let mut tables = self.tables.write();
        match tables.plans.iter_mut().find(|p| p.id == plan.id) {
            Some(existing) => {
                *existing = plan.clone();
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    async fn clear_main_flag(&self, portfolio_id: Uuid) -> Result<u64, AppError> {
        let mut tables = self.tables.write();
        let mut cleared = 0;
        for plan in tables.plans.iter_mut().filter(|p| p.portfolio_id == portfolio_id && p.is_main) {
            plan.is_main = false;
            plan.updated_at = Utc::now();
            cleared += 1;
        }
        Ok(cleared)
    }

    async fn list_allocations(&self, plan_id: Uuid) -> Result<Vec<PlanAllocation>, AppError> {
        Ok(self
            .tables
            .read()
            .allocations
            .iter()
            .filter(|a| a.plan_id == plan_id)
            .cloned()
            .collect())
    }

    async fn replace_allocations(
        &self,
        plan_id: Uuid,
        allocations: Vec<PlanAllocation>,
    ) -> Result<Vec<PlanAllocation>, AppError> {
        let mut tables = self.tables.write();
        tables.allocations.retain(|a| a.plan_id != plan_id);
        tables.allocations.extend(allocations.iter().cloned());
        Ok(allocations)
    }

    async fn list_groups(&self, plan_id: Uuid) -> Result<Vec<GroupWithItems>, AppError> {
        let mut groups: Vec<GroupWithItems> = self
            .tables
            .read()
            .groups
            .iter()
            .filter(|g| g.group.plan_id == plan_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.group.display_order);
        Ok(groups)
    }

    async fn replace_groups(&self, plan_id: Uuid, groups: Vec<GroupWithItems>) -> Result<Vec<GroupWithItems>, AppError> {
        let mut tables = self.tables.write();
        tables.groups.retain(|g| g.group.plan_id != plan_id);
        tables.groups.extend(groups.iter().cloned());
        Ok(groups)
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn get_user_settings(&self, user_id: Uuid) -> Result<Option<UserSettings>, AppError> {
        Ok(self.tables.read().user_settings.iter().find(|s| s.user_id == user_id).cloned())
    }

    async fn insert_user_settings(&self, settings: UserSettings) -> Result<UserSettings, AppError> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.user_settings.iter().find(|s| s.user_id == settings.user_id) {
            return Ok(existing.clone());
        }
        tables.user_settings.push(settings.clone());
        Ok(settings)
    }

    async fn update_user_settings(
        &self,
        user_id: Uuid,
        changes: &UpdateUserSettings,
    ) -> Result<Option<UserSettings>, AppError> {
        let mut tables = self.tables.write();
        let Some(settings) = tables.user_settings.iter_mut().find(|s| s.user_id == user_id) else {
            return Ok(None);
        };
        settings.apply(changes);
        Ok(Some(settings.clone()))
    }
}
