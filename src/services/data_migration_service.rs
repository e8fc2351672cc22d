use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::data_transfer::{
    ExportData, ExportedAllocation, ExportedAsset, ExportedGroup, ExportedGroupItem, ExportedPlan,
    ExportedPortfolio, ImportRequest, ImportResult, ImportStats, MergeStrategy, SCHEMA_VERSION,
};
use crate::models::{
    AllocationGroup, AllocationGroupItem, AllocationInput, Asset, CreateAsset, GroupWithItems,
    NewPlan, NewPortfolio, PlanAllocation, Portfolio, RebalancePlan,
};
use crate::services::portfolio_service;
use crate::store::Store;

pub const IMPORTED_PORTFOLIO_NAME: &str = "가져온 포트폴리오";
const SUPPORTED_MAJOR: &str = "1.";

/// Label written for a target that only referenced an asset by id, so the
/// file still resolves after ids change.
fn exported_ticker(ticker: &Option<String>, asset_id: Option<Uuid>, assets: &[Asset]) -> Option<String> {
    ticker.clone().or_else(|| {
        let asset = assets.iter().find(|a| Some(a.id) == asset_id)?;
        Some(asset.ticker().map(String::from).unwrap_or_else(|| asset.name.clone()))
    })
}

pub async fn export(store: &dyn Store, portfolio_id: Option<Uuid>) -> Result<ExportData, AppError> {
    let portfolios = match portfolio_id {
        Some(id) => vec![portfolio_service::fetch_one(store, id).await?],
        None => store.list_portfolios().await?,
    };

    let mut data = ExportData {
        schema_version: SCHEMA_VERSION.to_string(),
        export_date: Some(Utc::now()),
        portfolios: Vec::new(),
        assets: Vec::new(),
        rebalance_plans: Vec::new(),
        plan_allocations: Vec::new(),
        allocation_groups: Vec::new(),
    };

    for portfolio in portfolios {
        let assets = store.list_assets(portfolio.id, true).await?;
        data.assets.extend(assets.iter().map(|a| ExportedAsset {
            name: a.name.clone(),
            ticker: a.ticker.clone(),
            asset_type: a.asset_type.clone(),
            quantity: a.quantity.clone(),
            average_price: a.average_price.clone(),
            currency: a.currency.clone(),
            current_value: a.current_value.clone(),
            purchase_exchange_rate: a.purchase_exchange_rate.clone(),
            notes: a.notes.clone(),
            is_active: a.is_active,
            portfolio_name: Some(portfolio.name.clone()),
        }));

        for plan in store.list_plans(Some(portfolio.id), true).await? {
            for allocation in store.list_allocations(plan.id).await? {
                data.plan_allocations.push(ExportedAllocation {
                    ticker: exported_ticker(&allocation.ticker, allocation.asset_id, &assets),
                    alias: allocation.alias,
                    display_name: allocation.display_name,
                    target_percentage: allocation.target_percentage,
                    plan_name: Some(plan.name.clone()),
                });
            }

            for entry in store.list_groups(plan.id).await? {
                data.allocation_groups.push(ExportedGroup {
                    name: entry.group.name,
                    target_percentage: entry.group.target_percentage,
                    display_order: entry.group.display_order,
                    items: entry
                        .items
                        .iter()
                        .map(|item| ExportedGroupItem {
                            ticker: exported_ticker(&item.ticker, item.asset_id, &assets),
                            alias: item.alias.clone(),
                        })
                        .collect(),
                    plan_name: Some(plan.name.clone()),
                });
            }

            data.rebalance_plans.push(ExportedPlan {
                name: plan.name,
                description: plan.description,
                strategy_prompt: plan.strategy_prompt,
                is_main: plan.is_main,
                is_active: plan.is_active,
                portfolio_name: Some(portfolio.name.clone()),
            });
        }

        data.portfolios.push(ExportedPortfolio {
            name: portfolio.name,
            description: portfolio.description,
            base_currency: portfolio.base_currency,
            target_value: portfolio.target_value,
        });
    }

    info!(
        "Exported {} portfolios, {} assets, {} plans",
        data.portfolios.len(),
        data.assets.len(),
        data.rebalance_plans.len()
    );
    Ok(data)
}

/// Checks the version tag before decoding the rest of the document.
pub fn parse_export(raw: Value) -> Result<ExportData, AppError> {
    let version = raw
        .get("schema_version")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation("Missing schema_version".into()))?;
    if !version.starts_with(SUPPORTED_MAJOR) {
        return Err(AppError::Validation(format!("Unsupported schema version: {}", version)));
    }
    serde_json::from_value(raw).map_err(|e| AppError::Validation(format!("Invalid import data: {}", e)))
}

fn validate_export(data: &ExportData) -> Result<(), AppError> {
    for portfolio in &data.portfolios {
        if portfolio.name.trim().is_empty() {
            return Err(AppError::Validation("Portfolio name cannot be empty".into()));
        }
    }
    for asset in &data.assets {
        to_create_asset(asset).validate()?;
    }
    for plan in &data.rebalance_plans {
        if plan.name.trim().is_empty() {
            return Err(AppError::Validation("Plan name cannot be empty".into()));
        }
    }
    for allocation in &data.plan_allocations {
        to_allocation_input(allocation).validate()?;
    }
    Ok(())
}

fn to_create_asset(asset: &ExportedAsset) -> CreateAsset {
    CreateAsset {
        portfolio_id: None,
        name: asset.name.trim().to_string(),
        ticker: asset.ticker.clone(),
        asset_type: asset.asset_type.clone(),
        category_id: None,
        quantity: asset.quantity.clone(),
        average_price: asset.average_price.clone(),
        currency: asset.currency.trim().to_uppercase(),
        current_value: asset.current_value.clone(),
        purchase_exchange_rate: asset.purchase_exchange_rate.clone(),
        notes: asset.notes.clone(),
    }
}

fn to_allocation_input(allocation: &ExportedAllocation) -> AllocationInput {
    AllocationInput {
        asset_id: None,
        ticker: allocation.ticker.clone(),
        alias: allocation.alias.clone(),
        display_name: allocation.display_name.clone(),
        target_percentage: allocation.target_percentage.clone(),
    }
}

/// Loads an exported document. Portfolios are matched by name: `replace`
/// drops the existing one with everything under it, `merge` adds to it.
pub async fn import(store: &dyn Store, request: ImportRequest, default_currency: &str) -> Result<ImportResult, AppError> {
    let data = parse_export(request.data)?;
    if data.is_empty() {
        return Ok(ImportResult {
            success: true,
            message: "No data to import".to_string(),
            stats: ImportStats::default(),
        });
    }
    validate_export(&data)?;

    let mut stats = ImportStats::default();
    let mut by_name: HashMap<String, Portfolio> = HashMap::new();
    let mut first: Option<Portfolio> = None;

    for exported in &data.portfolios {
        let name = exported.name.trim().to_string();
        let existing = store.find_portfolio_by_name(&name).await?;

        let portfolio = match (existing, request.merge_strategy) {
            (Some(existing), MergeStrategy::Merge) => {
                stats.portfolios_updated += 1;
                existing
            }
            (existing, _) => {
                if let Some(existing) = existing {
                    info!("Replacing portfolio '{}' ({})", existing.name, existing.id);
                    store.delete_portfolio(existing.id).await?;
                }
                stats.portfolios_created += 1;
                store
                    .insert_portfolio(Portfolio::new(NewPortfolio {
                        name: name.clone(),
                        description: exported.description.clone(),
                        base_currency: exported.base_currency.trim().to_uppercase(),
                        target_value: exported.target_value.clone(),
                    }))
                    .await?
            }
        };

        first.get_or_insert_with(|| portfolio.clone());
        by_name.insert(name, portfolio);
    }

    let fallback = match first {
        Some(portfolio) => portfolio,
        None => match portfolio_service::default_portfolio(store).await? {
            Some(portfolio) => portfolio,
            None => {
                stats.portfolios_created += 1;
                store
                    .insert_portfolio(Portfolio::new(NewPortfolio {
                        name: IMPORTED_PORTFOLIO_NAME.to_string(),
                        description: None,
                        base_currency: default_currency.to_string(),
                        target_value: None,
                    }))
                    .await?
            }
        },
    };
    let target_portfolio = |name: &Option<String>| -> Uuid {
        name.as_ref()
            .and_then(|n| by_name.get(n.trim()))
            .map(|p| p.id)
            .unwrap_or(fallback.id)
    };

    for exported in &data.assets {
        let mut asset = Asset::new(target_portfolio(&exported.portfolio_name), to_create_asset(exported));
        asset.is_active = exported.is_active;
        store.insert_asset(asset).await?;
        stats.assets_created += 1;
    }

    let mut plan_ids: HashMap<String, Uuid> = HashMap::new();
    for exported in &data.rebalance_plans {
        let portfolio_id = target_portfolio(&exported.portfolio_name);
        if exported.is_main {
            store.clear_main_flag(portfolio_id).await?;
        }
        let plan = store
            .insert_plan(RebalancePlan::new(NewPlan {
                portfolio_id,
                name: exported.name.trim().to_string(),
                description: exported.description.clone(),
                strategy_prompt: exported.strategy_prompt.clone(),
                is_main: exported.is_main,
                is_active: exported.is_active,
            }))
            .await?;
        plan_ids.insert(plan.name.clone(), plan.id);
        stats.plans_created += 1;
    }

    let plan_for = |name: &Option<String>| name.as_ref().and_then(|n| plan_ids.get(n.trim())).copied();

    let mut allocations: HashMap<Uuid, Vec<PlanAllocation>> = HashMap::new();
    for exported in &data.plan_allocations {
        let Some(plan_id) = plan_for(&exported.plan_name) else {
            warn!("Skipping allocation for unknown plan {:?}", exported.plan_name);
            continue;
        };
        let input = to_allocation_input(exported).sanitized();
        allocations.entry(plan_id).or_default().push(PlanAllocation::new(plan_id, &input));
    }
    for (plan_id, rows) in allocations {
        stats.allocations_created += rows.len() as u32;
        store.replace_allocations(plan_id, rows).await?;
    }

    let mut groups: HashMap<Uuid, Vec<GroupWithItems>> = HashMap::new();
    for exported in &data.allocation_groups {
        let Some(plan_id) = plan_for(&exported.plan_name) else {
            warn!("Skipping group '{}' for unknown plan {:?}", exported.name, exported.plan_name);
            continue;
        };
        let group = AllocationGroup {
            id: Uuid::new_v4(),
            plan_id,
            name: exported.name.trim().to_string(),
            target_percentage: exported.target_percentage.clone(),
            display_order: exported.display_order,
            created_at: Utc::now(),
        };
        let items = exported
            .items
            .iter()
            .map(|item| AllocationGroupItem {
                id: Uuid::new_v4(),
                group_id: group.id,
                asset_id: None,
                ticker: item.ticker.clone(),
                alias: item.alias.clone(),
            })
            .collect();
        groups.entry(plan_id).or_default().push(GroupWithItems { group, items });
    }
    for (plan_id, rows) in groups {
        stats.groups_created += rows.len() as u32;
        store.replace_groups(plan_id, rows).await?;
    }

    info!("Import finished: {:?}", stats);
    Ok(ImportResult {
        success: true,
        message: "Import completed".to_string(),
        stats,
    })
}

pub fn schema_info() -> Value {
    json!({
        "current_version": SCHEMA_VERSION,
        "supported_versions": [SCHEMA_VERSION],
        "merge_strategies": ["replace", "merge"],
        "fields": {
            "portfolios": ["name", "description", "base_currency", "target_value"],
            "assets": [
                "name", "ticker", "asset_type", "quantity", "average_price", "currency",
                "current_value", "purchase_exchange_rate", "notes", "is_active", "_portfolio_name"
            ],
            "rebalance_plans": ["name", "description", "strategy_prompt", "is_main", "is_active", "_portfolio_name"],
            "plan_allocations": ["ticker", "alias", "display_name", "target_percentage", "_plan_name"],
            "allocation_groups": ["name", "target_percentage", "display_order", "items", "_plan_name"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupInput;
    use crate::services::rebalance_service;
    use crate::store::{AssetRepository, MemoryStore};
    use bigdecimal::BigDecimal;

    fn sample() -> Value {
        json!({
            "schema_version": "1.0.0",
            "portfolios": [{ "name": "Retirement", "base_currency": "KRW", "target_value": "100000000" }],
            "assets": [
                { "name": "Apple Inc.", "ticker": "AAPL", "quantity": "3", "average_price": "150",
                  "currency": "USD", "_portfolio_name": "Retirement" },
                { "name": "CMA", "current_value": "500000", "asset_type": "cash" }
            ],
            "rebalance_plans": [{ "name": "Core", "is_main": true, "_portfolio_name": "Retirement" }],
            "plan_allocations": [
                { "ticker": "AAPL", "target_percentage": "60", "_plan_name": "Core" },
                { "alias": "cma", "target_percentage": "40", "_plan_name": "Core" },
                { "ticker": "X", "target_percentage": "1", "_plan_name": "Missing" }
            ],
            "allocation_groups": [
                { "name": "Cash", "target_percentage": "40", "items": [{ "alias": "cma" }], "_plan_name": "Core" }
            ]
        })
    }

    fn request(data: Value, merge_strategy: MergeStrategy) -> ImportRequest {
        ImportRequest { data, merge_strategy }
    }

    #[tokio::test]
    async fn test_import_creates_everything_by_name() {
        let store = MemoryStore::new();
        let result = import(&store, request(sample(), MergeStrategy::Replace), "KRW").await.unwrap();

        assert!(result.success);
        assert_eq!(result.stats.portfolios_created, 1);
        assert_eq!(result.stats.assets_created, 2);
        assert_eq!(result.stats.plans_created, 1);
        assert_eq!(result.stats.allocations_created, 2);
        assert_eq!(result.stats.groups_created, 1);

        let main = rebalance_service::find_main_plan(&store, None).await.unwrap().unwrap();
        assert_eq!(main.name, "Core");
        assert_eq!(store.list_assets(main.portfolio_id, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replace_and_merge_strategies() {
        let store = MemoryStore::new();
        import(&store, request(sample(), MergeStrategy::Replace), "KRW").await.unwrap();
        import(&store, request(sample(), MergeStrategy::Replace), "KRW").await.unwrap();

        let portfolios = store.list_portfolios().await.unwrap();
        assert_eq!(portfolios.len(), 1);
        assert_eq!(store.list_assets(portfolios[0].id, true).await.unwrap().len(), 2);

        let merged = import(&store, request(sample(), MergeStrategy::Merge), "KRW").await.unwrap();
        assert_eq!(merged.stats.portfolios_updated, 1);
        assert_eq!(merged.stats.portfolios_created, 0);
        assert_eq!(store.list_portfolios().await.unwrap().len(), 1);
        assert_eq!(store.list_assets(portfolios[0].id, true).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_rejects_unsupported_version() {
        let store = MemoryStore::new();
        let err = import(&store, request(json!({ "schema_version": "2.0.0" }), MergeStrategy::Replace), "KRW")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let empty = import(&store, request(json!({ "schema_version": "1.2.0" }), MergeStrategy::Replace), "KRW")
            .await
            .unwrap();
        assert_eq!(empty.stats, ImportStats::default());
    }

    #[tokio::test]
    async fn test_export_round_trips_through_import() {
        let source = MemoryStore::new();
        import(&source, request(sample(), MergeStrategy::Replace), "KRW").await.unwrap();
        let plan = rebalance_service::find_main_plan(&source, None).await.unwrap().unwrap();
        let apple = source
            .list_assets(plan.portfolio_id, false)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.name == "Apple Inc.")
            .unwrap();
        rebalance_service::replace_groups(
            &source,
            plan.id,
            vec![GroupInput {
                name: "US".into(),
                target_percentage: BigDecimal::from(60),
                display_order: None,
                items: vec![crate::models::GroupItemInput { asset_id: Some(apple.id), ticker: None, alias: None }],
            }],
        )
        .await
        .unwrap();

        let exported = export(&source, None).await.unwrap();
        assert_eq!(exported.allocation_groups[0].items[0].ticker.as_deref(), Some("AAPL"));

        let target = MemoryStore::new();
        let raw = serde_json::to_value(&exported).unwrap();
        let result = import(&target, request(raw, MergeStrategy::Replace), "KRW").await.unwrap();
        assert_eq!(result.stats.assets_created, 2);
        assert_eq!(result.stats.groups_created, 1);
    }
}
