pub mod portfolio_queries;
pub mod asset_queries;
pub mod plan_queries;
pub mod allocation_queries;
pub mod group_queries;
pub mod asset_history_queries;
pub mod benchmark_queries;
pub mod user_settings_queries;
