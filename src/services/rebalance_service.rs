use bigdecimal::{BigDecimal, Zero};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    AllocationGroup, AllocationGroupItem, AllocationInput, AllocationWithValue, Asset, CreatePlan,
    GroupInput, GroupWithItems, GroupWithValue, MainPlanResponse, NewPlan, PlanAllocation,
    PlanCalculation, PlanDetails, RebalancePlan, UpdatePlan,
};
use crate::services::finance_service::FinanceService;
use crate::services::portfolio_service;
use crate::services::asset_matcher::{match_asset, AssetDescriptor};
use crate::services::numeric::percentage_of;
use crate::services::suggestion_engine::{suggest_allocation, suggest_group};
use crate::services::valuation_service::{value_assets, ValuationSnapshot};
use crate::store::Store;

pub async fn fetch_plan(store: &dyn Store, id: Uuid) -> Result<RebalancePlan, AppError> {
    store.get_plan(id).await?.ok_or(AppError::plan_not_found())
}

async fn with_details(store: &dyn Store, plan: RebalancePlan) -> Result<PlanDetails, AppError> {
    let allocations = store.list_allocations(plan.id).await?;
    let groups = store.list_groups(plan.id).await?;
    Ok(PlanDetails { plan, allocations, groups })
}

/// Active plans, newest first. Without a portfolio id every portfolio is listed.
pub async fn list_plans(store: &dyn Store, portfolio_id: Option<Uuid>) -> Result<Vec<PlanDetails>, AppError> {
    let plans = store.list_plans(portfolio_id, false).await?;
    let mut details = Vec::with_capacity(plans.len());
    for plan in plans {
        details.push(with_details(store, plan).await?);
    }
    Ok(details)
}

pub async fn get_plan(store: &dyn Store, id: Uuid) -> Result<PlanDetails, AppError> {
    let plan = fetch_plan(store, id).await?;
    with_details(store, plan).await
}

pub async fn create_plan(store: &dyn Store, input: CreatePlan, default_currency: &str) -> Result<PlanDetails, AppError> {
    input.validate()?;
    let portfolio = portfolio_service::resolve_or_create(store, input.portfolio_id, default_currency).await?;

    if input.is_main {
        store.clear_main_flag(portfolio.id).await?;
    }

    let plan = store
        .insert_plan(RebalancePlan::new(NewPlan {
            portfolio_id: portfolio.id,
            name: input.name.trim().to_string(),
            description: input.description,
            strategy_prompt: input.strategy_prompt,
            is_main: input.is_main,
            is_active: true,
        }))
        .await?;
    info!("Created plan '{}' ({}) for portfolio {}", plan.name, plan.id, portfolio.id);

    let allocations = build_allocations(plan.id, input.allocations);
    let allocations = store.replace_allocations(plan.id, allocations).await?;
    Ok(PlanDetails { plan, allocations, groups: Vec::new() })
}

pub async fn update_plan(store: &dyn Store, id: Uuid, input: UpdatePlan) -> Result<RebalancePlan, AppError> {
    input.validate()?;
    let mut plan = fetch_plan(store, id).await?;

    if input.is_main == Some(true) && !plan.is_main {
        store.clear_main_flag(plan.portfolio_id).await?;
    }

    let input = UpdatePlan { name: input.name.map(|n| n.trim().to_string()), ..input };
    plan.apply(&input);
    store.update_plan(plan).await?.ok_or(AppError::plan_not_found())
}

pub async fn soft_delete_plan(store: &dyn Store, id: Uuid) -> Result<(), AppError> {
    let mut plan = fetch_plan(store, id).await?;
    plan.apply(&UpdatePlan { is_active: Some(false), ..Default::default() });
    store.update_plan(plan).await?.ok_or(AppError::plan_not_found())?;
    info!("Deactivated plan {}", id);
    Ok(())
}

/// Clears the flag on the portfolio's other plans, then sets it on this one.
/// The two writes are separate; re-running repairs a portfolio left without a main plan.
pub async fn set_main_plan(store: &dyn Store, id: Uuid) -> Result<RebalancePlan, AppError> {
    let mut plan = fetch_plan(store, id).await?;
    let cleared = store.clear_main_flag(plan.portfolio_id).await?;
    debug!("Cleared main flag on {} plan(s) of portfolio {}", cleared, plan.portfolio_id);

    plan.apply(&UpdatePlan { is_main: Some(true), ..Default::default() });
    store.update_plan(plan).await?.ok_or(AppError::plan_not_found())
}

fn build_allocations(plan_id: Uuid, inputs: Vec<AllocationInput>) -> Vec<PlanAllocation> {
    inputs
        .into_iter()
        .map(AllocationInput::sanitized)
        .map(|input| PlanAllocation::new(plan_id, &input))
        .collect()
}

/// Replaces every individual target of the plan.
pub async fn replace_allocations(
    store: &dyn Store,
    id: Uuid,
    inputs: Vec<AllocationInput>,
) -> Result<PlanDetails, AppError> {
    inputs.iter().try_for_each(AllocationInput::validate)?;
    let plan = fetch_plan(store, id).await?;

    store.replace_allocations(plan.id, build_allocations(plan.id, inputs)).await?;
    with_details(store, plan).await
}

fn build_groups(plan_id: Uuid, inputs: Vec<GroupInput>) -> Vec<GroupWithItems> {
    let now = chrono::Utc::now();
    inputs
        .into_iter()
        .map(GroupInput::sanitized)
        .enumerate()
        .map(|(position, input)| {
            let group = AllocationGroup {
                id: Uuid::new_v4(),
                plan_id,
                name: input.name,
                target_percentage: input.target_percentage,
                display_order: input.display_order.unwrap_or(position as i32),
                created_at: now,
            };
            let items = input
                .items
                .into_iter()
                .map(|item| AllocationGroupItem {
                    id: Uuid::new_v4(),
                    group_id: group.id,
                    asset_id: item.asset_id,
                    ticker: item.ticker,
                    alias: item.alias,
                })
                .collect();
            GroupWithItems { group, items }
        })
        .collect()
}

/// Replaces every group (and its members) of the plan.
pub async fn replace_groups(store: &dyn Store, id: Uuid, inputs: Vec<GroupInput>) -> Result<Vec<GroupWithItems>, AppError> {
    inputs.iter().try_for_each(GroupInput::validate)?;
    let plan = fetch_plan(store, id).await?;

    store.replace_groups(plan.id, build_groups(plan.id, inputs)).await?;
    store.list_groups(plan.id).await
}

pub async fn list_groups(store: &dyn Store, id: Uuid) -> Result<Vec<GroupWithItems>, AppError> {
    let plan = fetch_plan(store, id).await?;
    store.list_groups(plan.id).await
}

fn empty_calculation(plan: RebalancePlan) -> PlanCalculation {
    PlanCalculation {
        plan_id: plan.id,
        plan_name: plan.name,
        total_value: BigDecimal::zero(),
        suggestions: Vec::new(),
        group_suggestions: Vec::new(),
    }
}

/// Suggestions for every target of the plan against one valuation of the
/// portfolio's active assets. Defaults to the plan's own portfolio.
///
/// An empty plan or a portfolio with no active assets yields a zero total and
/// no suggestions.
pub async fn calculate_for_plan(
    store: &dyn Store,
    finance: &FinanceService,
    plan_id: Uuid,
    portfolio_id: Option<Uuid>,
) -> Result<PlanCalculation, AppError> {
    let plan = fetch_plan(store, plan_id).await?;
    let allocations = store.list_allocations(plan.id).await?;
    let groups = store.list_groups(plan.id).await?;

    if allocations.is_empty() && groups.is_empty() {
        return Ok(empty_calculation(plan));
    }

    let portfolio = portfolio_service::fetch_one(store, portfolio_id.unwrap_or(plan.portfolio_id)).await?;
    let assets = store.list_assets(portfolio.id, false).await?;
    if assets.is_empty() {
        debug!("Portfolio {} holds no active assets, nothing to rebalance", portfolio.id);
        return Ok(empty_calculation(plan));
    }
    let snapshot = value_assets(finance, &assets, &portfolio.base_currency).await;

    let suggestions = allocations
        .iter()
        .map(|allocation| suggest_allocation(allocation, &assets, &snapshot))
        .collect();
    let group_suggestions = groups
        .iter()
        .map(|entry| suggest_group(&entry.group, &entry.items, &assets, &snapshot))
        .collect();

    Ok(PlanCalculation {
        plan_id: plan.id,
        plan_name: plan.name,
        total_value: snapshot.total_value.clone(),
        suggestions,
        group_suggestions,
    })
}

pub async fn find_main_plan(store: &dyn Store, portfolio_id: Option<Uuid>) -> Result<Option<RebalancePlan>, AppError> {
    let Some(portfolio) = portfolio_service::resolve(store, portfolio_id).await? else {
        return Ok(None);
    };
    store.find_main_plan(portfolio.id).await
}

fn allocation_with_value(allocation: PlanAllocation, assets: &[Asset], snapshot: &ValuationSnapshot) -> AllocationWithValue {
    let matched = match_asset(&AssetDescriptor::from(&allocation), assets);
    let current_value = matched
        .map(|asset| snapshot.market_value(&asset.id))
        .unwrap_or_else(BigDecimal::zero);

    AllocationWithValue {
        current_percentage: percentage_of(&current_value, &snapshot.total_value),
        matched_asset_name: matched.map(|a| a.name.clone()),
        current_value,
        allocation,
    }
}

fn group_with_value(entry: GroupWithItems, assets: &[Asset], snapshot: &ValuationSnapshot) -> GroupWithValue {
    let current_value = entry
        .items
        .iter()
        .filter_map(|item| match_asset(&AssetDescriptor::from(item), assets))
        .fold(BigDecimal::zero(), |sum, asset| sum + snapshot.market_value(&asset.id));

    GroupWithValue {
        current_percentage: percentage_of(&current_value, &snapshot.total_value),
        current_value,
        group: entry,
    }
}

/// The main plan with each target annotated with its current value, or `None`
/// when the portfolio has no main plan.
pub async fn get_main_plan(
    store: &dyn Store,
    finance: &FinanceService,
    portfolio_id: Option<Uuid>,
) -> Result<Option<MainPlanResponse>, AppError> {
    let Some(plan) = find_main_plan(store, portfolio_id).await? else {
        return Ok(None);
    };
    let allocations = store.list_allocations(plan.id).await?;
    let groups = store.list_groups(plan.id).await?;

    let portfolio = portfolio_service::fetch_one(store, plan.portfolio_id).await?;
    let assets = store.list_assets(portfolio.id, false).await?;
    let snapshot = if assets.is_empty() || (allocations.is_empty() && groups.is_empty()) {
        ValuationSnapshot::empty(&portfolio.base_currency)
    } else {
        value_assets(finance, &assets, &portfolio.base_currency).await
    };

    Ok(Some(MainPlanResponse {
        plan,
        allocations: allocations
            .into_iter()
            .map(|allocation| allocation_with_value(allocation, &assets, &snapshot))
            .collect(),
        groups: groups
            .into_iter()
            .map(|entry| group_with_value(entry, &assets, &snapshot))
            .collect(),
    }))
}
