//! Persistence seams. Services only see these traits; `PgStore` backs them
//! with Postgres and `MemoryStore` keeps everything in process.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    Asset, AssetHistory, GroupWithItems, NewAssetSnapshot, PlanAllocation, Portfolio,
    RebalancePlan, UpdatePortfolio, UpdateUserSettings, UserSettings,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait AssetRepository: Send + Sync {
    // Portfolios, oldest first
    async fn list_portfolios(&self) -> Result<Vec<Portfolio>, AppError>;
    async fn get_portfolio(&self, id: Uuid) -> Result<Option<Portfolio>, AppError>;
    async fn find_portfolio_by_name(&self, name: &str) -> Result<Option<Portfolio>, AppError>;
    async fn insert_portfolio(&self, portfolio: Portfolio) -> Result<Portfolio, AppError>;
    async fn update_portfolio(&self, id: Uuid, changes: UpdatePortfolio) -> Result<Option<Portfolio>, AppError>;
    /// Removes the portfolio together with its assets, plans and history.
    async fn delete_portfolio(&self, id: Uuid) -> Result<u64, AppError>;

    // Assets, in insertion order
    async fn list_assets(&self, portfolio_id: Uuid, include_inactive: bool) -> Result<Vec<Asset>, AppError>;
    async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>, AppError>;
    async fn insert_asset(&self, asset: Asset) -> Result<Asset, AppError>;
    async fn update_asset(&self, asset: Asset) -> Result<Option<Asset>, AppError>;
    async fn delete_asset(&self, id: Uuid) -> Result<u64, AppError>;

    // Daily history
    async fn upsert_snapshot(&self, snapshot: NewAssetSnapshot) -> Result<AssetHistory, AppError>;
    /// Ascending by date; `limit` keeps the most recent rows.
    async fn list_history(
        &self,
        portfolio_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: i64,
    ) -> Result<Vec<AssetHistory>, AppError>;
    async fn upsert_benchmark_close(&self, ticker: &str, date: NaiveDate, close: BigDecimal) -> Result<(), AppError>;
}

#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Newest first.
    async fn list_plans(&self, portfolio_id: Option<Uuid>, include_inactive: bool) -> Result<Vec<RebalancePlan>, AppError>;
    async fn get_plan(&self, id: Uuid) -> Result<Option<RebalancePlan>, AppError>;
    /// The active plan flagged main, if any.
    async fn find_main_plan(&self, portfolio_id: Uuid) -> Result<Option<RebalancePlan>, AppError>;
    async fn insert_plan(&self, plan: RebalancePlan) -> Result<RebalancePlan, AppError>;
    async fn update_plan(&self, plan: RebalancePlan) -> Result<Option<RebalancePlan>, AppError>;
    /// Clears `is_main` on every plan of the portfolio.
    async fn clear_main_flag(&self, portfolio_id: Uuid) -> Result<u64, AppError>;

    async fn list_allocations(&self, plan_id: Uuid) -> Result<Vec<PlanAllocation>, AppError>;
    /// Deletes every allocation of the plan, then inserts `allocations`.
    async fn replace_allocations(
        &self,
        plan_id: Uuid,
        allocations: Vec<PlanAllocation>,
    ) -> Result<Vec<PlanAllocation>, AppError>;

    /// Ordered by `display_order`, items in insertion order.
    async fn list_groups(&self, plan_id: Uuid) -> Result<Vec<GroupWithItems>, AppError>;
    /// Deletes every group (and item) of the plan, then inserts `groups`.
    async fn replace_groups(&self, plan_id: Uuid, groups: Vec<GroupWithItems>) -> Result<Vec<GroupWithItems>, AppError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_user_settings(&self, user_id: Uuid) -> Result<Option<UserSettings>, AppError>;
    /// Returns the stored row when the user already has one.
    async fn insert_user_settings(&self, settings: UserSettings) -> Result<UserSettings, AppError>;
    /// `None` when the user has no row yet.
    async fn update_user_settings(
        &self,
        user_id: Uuid,
        changes: &UpdateUserSettings,
    ) -> Result<Option<UserSettings>, AppError>;
}

pub trait Store: AssetRepository + PlanRepository + SettingsRepository {}

impl<T: AssetRepository + PlanRepository + SettingsRepository> Store for T {}
