mod portfolio;
mod asset;
mod plan;
mod suggestion;
mod asset_history;
mod user_settings;
pub mod dashboard;
pub mod data_transfer;

pub use portfolio::{Portfolio, NewPortfolio, UpdatePortfolio};
pub use asset::{Asset, CreateAsset, UpdateAsset, EnrichedAsset, TickerValidation};
pub use plan::{
    RebalancePlan, PlanAllocation, AllocationGroup, AllocationGroupItem, GroupWithItems,
    PlanDetails, NewPlan, CreatePlan, UpdatePlan, AllocationInput, GroupInput, GroupItemInput,
};
pub use suggestion::{
    AllocationSuggestion, AllocationWithValue, GroupItemDetail, GroupSuggestion, GroupWithValue,
    MainPlanResponse, PlanCalculation,
};
pub use asset_history::{AssetHistory, NewAssetSnapshot, BenchmarkClose, HistoryQuery};
pub use user_settings::{
    UpdateUserSettings, UserSettings, DEFAULT_ALERT_THRESHOLD, DEFAULT_CALCULATOR_TOLERANCE,
};
pub use dashboard::*;
