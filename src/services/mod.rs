pub mod numeric;
pub mod fx_cache;
pub mod finance_service;
pub mod asset_matcher;
pub mod valuation_service;
pub mod suggestion_engine;
pub mod portfolio_service;
pub mod asset_service;
pub mod rebalance_service;
pub mod dashboard_service;
pub mod settings_service;
pub mod data_migration_service;
pub mod job_scheduler_service;
