pub(crate) mod health;
pub(crate) mod portfolios;
pub(crate) mod assets;
pub(crate) mod dashboard;
pub(crate) mod rebalance;
pub(crate) mod data_migration;
pub(crate) mod jobs;
pub(crate) mod settings;
