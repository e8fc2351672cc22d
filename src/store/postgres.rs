use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    allocation_queries, asset_history_queries, asset_queries, benchmark_queries, group_queries,
    plan_queries, portfolio_queries, user_settings_queries,
};
use crate::errors::AppError;
use crate::models::{
    Asset, AssetHistory, GroupWithItems, NewAssetSnapshot, PlanAllocation, Portfolio, RebalancePlan,
    UpdatePortfolio, UpdateUserSettings, UserSettings,
};
use crate::store::{AssetRepository, PlanRepository, SettingsRepository};

/// Postgres-backed store. Multi-statement writes are not transactional.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AssetRepository for PgStore {
    async fn list_portfolios(&self) -> Result<Vec<Portfolio>, AppError> {
        Ok(portfolio_queries::fetch_all(&self.pool).await?)
    }

    async fn get_portfolio(&self, id: Uuid) -> Result<Option<Portfolio>, AppError> {
        Ok(portfolio_queries::fetch_one(&self.pool, id).await?)
    }

    async fn find_portfolio_by_name(&self, name: &str) -> Result<Option<Portfolio>, AppError> {
        Ok(portfolio_queries::fetch_by_name(&self.pool, name).await?)
    }

    async fn insert_portfolio(&self, portfolio: Portfolio) -> Result<Portfolio, AppError> {
        Ok(portfolio_queries::insert(&self.pool, portfolio).await?)
    }

    async fn update_portfolio(&self, id: Uuid, changes: UpdatePortfolio) -> Result<Option<Portfolio>, AppError> {
        Ok(portfolio_queries::update(&self.pool, id, changes).await?)
    }

    async fn delete_portfolio(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(portfolio_queries::delete(&self.pool, id).await?)
    }

    async fn list_assets(&self, portfolio_id: Uuid, include_inactive: bool) -> Result<Vec<Asset>, AppError> {
        Ok(asset_queries::fetch_for_portfolio(&self.pool, portfolio_id, include_inactive).await?)
    }

    async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        Ok(asset_queries::fetch_one(&self.pool, id).await?)
    }

    async fn insert_asset(&self, asset: Asset) -> Result<Asset, AppError> {
        Ok(asset_queries::insert(&self.pool, asset).await?)
    }

    async fn update_asset(&self, asset: Asset) -> Result<Option<Asset>, AppError> {
        Ok(asset_queries::update(&self.pool, asset).await?)
    }

    async fn delete_asset(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(asset_queries::delete(&self.pool, id).await?)
    }

    async fn upsert_snapshot(&self, snapshot: NewAssetSnapshot) -> Result<AssetHistory, AppError> {
        Ok(asset_history_queries::upsert(&self.pool, snapshot).await?)
    }

    async fn list_history(
        &self,
        portfolio_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: i64,
    ) -> Result<Vec<AssetHistory>, AppError> {
        Ok(asset_history_queries::fetch_range(&self.pool, portfolio_id, start, end, limit).await?)
    }

    async fn upsert_benchmark_close(&self, ticker: &str, date: NaiveDate, close: BigDecimal) -> Result<(), AppError> {
        Ok(benchmark_queries::upsert_close(&self.pool, ticker, date, close).await?)
    }
}

#[async_trait]
impl PlanRepository for PgStore {
    async fn list_plans(&self, portfolio_id: Option<Uuid>, include_inactive: bool) -> Result<Vec<RebalancePlan>, AppError> {
        Ok(plan_queries::fetch_all(&self.pool, portfolio_id, include_inactive).await?)
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<RebalancePlan>, AppError> {
        Ok(plan_queries::fetch_one(&self.pool, id).await?)
    }

    async fn find_main_plan(&self, portfolio_id: Uuid) -> Result<Option<RebalancePlan>, AppError> {
        Ok(plan_queries::fetch_main(&self.pool, portfolio_id).await?)
    }

    async fn insert_plan(&self, plan: RebalancePlan) -> Result<RebalancePlan, AppError> {
        Ok(plan_queries::insert(&self.pool, plan).await?)
    }

    async fn update_plan(&self, plan: RebalancePlan) -> Result<Option<RebalancePlan>, AppError> {
        Ok(plan_queries::update(&self.pool, plan).await?)
    }

    async fn clear_main_flag(&self, portfolio_id: Uuid) -> Result<u64, AppError> {
        Ok(plan_queries::clear_main(&self.pool, portfolio_id).await?)
    }

    async fn list_allocations(&self, plan_id: Uuid) -> Result<Vec<PlanAllocation>, AppError> {
        Ok(allocation_queries::fetch_for_plan(&self.pool, plan_id).await?)
    }

    async fn replace_allocations(
        &self,
        plan_id: Uuid,
        allocations: Vec<PlanAllocation>,
    ) -> Result<Vec<PlanAllocation>, AppError> {
        allocation_queries::delete_for_plan(&self.pool, plan_id).await?;
        for (position, allocation) in allocations.iter().enumerate() {
            allocation_queries::insert(&self.pool, allocation, position as i32).await?;
        }
        Ok(allocations)
    }

    async fn list_groups(&self, plan_id: Uuid) -> Result<Vec<GroupWithItems>, AppError> {
        let groups = group_queries::fetch_groups(&self.pool, plan_id).await?;
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
        let mut items_by_group: HashMap<Uuid, Vec<_>> = HashMap::new();
        for item in group_queries::fetch_items(&self.pool, &ids).await? {
            items_by_group.entry(item.group_id).or_default().push(item);
        }

        Ok(groups
            .into_iter()
            .map(|group| {
                let items = items_by_group.remove(&group.id).unwrap_or_default();
                GroupWithItems { group, items }
            })
            .collect())
    }

    async fn replace_groups(&self, plan_id: Uuid, groups: Vec<GroupWithItems>) -> Result<Vec<GroupWithItems>, AppError> {
        group_queries::delete_for_plan(&self.pool, plan_id).await?;
        for entry in &groups {
            group_queries::insert_group(&self.pool, &entry.group).await?;
            for (position, item) in entry.items.iter().enumerate() {
                group_queries::insert_item(&self.pool, item, position as i32).await?;
            }
        }
        Ok(groups)
    }
}

#[async_trait]
impl SettingsRepository for PgStore {
    async fn get_user_settings(&self, user_id: Uuid) -> Result<Option<UserSettings>, AppError> {
        Ok(user_settings_queries::fetch_for_user(&self.pool, user_id).await?)
    }

    async fn insert_user_settings(&self, settings: UserSettings) -> Result<UserSettings, AppError> {
        Ok(user_settings_queries::insert(&self.pool, settings).await?)
    }

    async fn update_user_settings(
        &self,
        user_id: Uuid,
        changes: &UpdateUserSettings,
    ) -> Result<Option<UserSettings>, AppError> {
        Ok(user_settings_queries::update(&self.pool, user_id, changes).await?)
    }
}
