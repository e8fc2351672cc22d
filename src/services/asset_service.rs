use std::collections::HashMap;
use std::hash::Hash;

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    Asset, CategoryAllocation, CategoryRebalanceResponse, CategoryRebalanceSuggestion,
    CategoryTarget, CreateAsset, DashboardSummary, EnrichedAsset, RebalancePlan, UpdateAsset,
    DEFAULT_CATEGORY_COLOR, UNCATEGORIZED, UNKNOWN_CATEGORY,
};
use crate::services::finance_service::FinanceService;
use crate::services::numeric::{percentage_of, round2, share_of, to_decimal};
use crate::services::portfolio_service;
use crate::store::Store;

/// Assets of the resolved portfolio, priced in its base currency.
pub async fn fetch_enriched(
    store: &dyn Store,
    finance: &FinanceService,
    portfolio_id: Option<Uuid>,
    include_inactive: bool,
) -> Result<Vec<EnrichedAsset>, AppError> {
    let Some(portfolio) = portfolio_service::resolve(store, portfolio_id).await? else {
        return Ok(Vec::new());
    };
    let assets = store.list_assets(portfolio.id, include_inactive).await?;
    Ok(finance.enrich_assets(assets, &portfolio.base_currency).await)
}

pub async fn fetch_one(store: &dyn Store, id: Uuid) -> Result<Asset, AppError> {
    store.get_asset(id).await?.ok_or(AppError::asset_not_found())
}

pub async fn fetch_one_enriched(
    store: &dyn Store,
    finance: &FinanceService,
    id: Uuid,
) -> Result<EnrichedAsset, AppError> {
    let asset = fetch_one(store, id).await?;
    let portfolio = portfolio_service::fetch_one(store, asset.portfolio_id).await?;
    let mut enriched = finance.enrich_assets(vec![asset], &portfolio.base_currency).await;
    enriched.pop().ok_or(AppError::asset_not_found())
}

/// Tickers are checked against the market data provider before anything is stored.
pub async fn create(
    store: &dyn Store,
    finance: &FinanceService,
    input: CreateAsset,
    default_currency: &str,
) -> Result<Asset, AppError> {
    input.validate()?;

    if let Some(ticker) = input.ticker.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let validation = finance.validate_ticker(ticker).await;
        if !validation.valid {
            warn!("Rejected asset with invalid ticker {}", ticker);
            return Err(AppError::Validation(format!(
                "Invalid ticker '{}': {}",
                ticker,
                validation.error.unwrap_or_else(|| "unknown ticker".to_string())
            )));
        }
    }

    let portfolio = portfolio_service::resolve_or_create(store, input.portfolio_id, default_currency).await?;
    let input = CreateAsset {
        name: input.name.trim().to_string(),
        currency: input.currency.trim().to_uppercase(),
        ..input
    };

    let asset = store.insert_asset(Asset::new(portfolio.id, input)).await?;
    info!("Created asset {} ({}) in portfolio {}", asset.name, asset.id, portfolio.id);
    Ok(asset)
}

pub async fn update(store: &dyn Store, id: Uuid, input: UpdateAsset) -> Result<Asset, AppError> {
    input.validate()?;
    let mut asset = fetch_one(store, id).await?;
    asset.apply(input);
    store.update_asset(asset).await?.ok_or(AppError::asset_not_found())
}

/// Soft delete only deactivates the asset; it stays in history and exports.
pub async fn delete(store: &dyn Store, id: Uuid, hard_delete: bool) -> Result<(), AppError> {
    if hard_delete {
        return match store.delete_asset(id).await? {
            0 => Err(AppError::asset_not_found()),
            _ => Ok(()),
        };
    }

    let mut asset = fetch_one(store, id).await?;
    asset.apply(UpdateAsset { is_active: Some(false), ..Default::default() });
    store.update_asset(asset).await?.ok_or(AppError::asset_not_found())?;
    Ok(())
}

/// Principal counted for the summary. Cash is its own principal.
fn summary_principal(asset: &EnrichedAsset) -> BigDecimal {
    if asset.asset.is_cash() {
        return asset.market_value.clone();
    }
    asset.cost_basis.clone().unwrap_or_else(BigDecimal::zero)
}

fn category_label(enriched: &EnrichedAsset) -> String {
    enriched
        .asset
        .category_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

/// Market value summed per key in first-seen order, each with the first asset
/// seen under that key. Assets without a key are left out.
fn group_values<K, F>(assets: &[EnrichedAsset], key: F) -> Vec<(K, &EnrichedAsset, BigDecimal)>
where
    K: Eq + Hash + Clone,
    F: Fn(&EnrichedAsset) -> Option<K>,
{
    let mut groups: Vec<(K, &EnrichedAsset, BigDecimal)> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();

    for enriched in assets {
        let Some(k) = key(enriched) else { continue };
        match index.get(&k) {
            Some(&i) => groups[i].2 += &enriched.market_value,
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, enriched, enriched.market_value.clone()));
            }
        }
    }
    groups
}

fn total_market_value(assets: &[EnrichedAsset]) -> BigDecimal {
    assets
        .iter()
        .fold(BigDecimal::zero(), |sum, enriched| sum + &enriched.market_value)
}

/// Portfolio totals and per-category weights from already priced assets.
pub fn calculate_summary(assets: &[EnrichedAsset], main_plan: Option<&RebalancePlan>) -> DashboardSummary {
    let total_value = total_market_value(assets);
    let total_principal = assets
        .iter()
        .fold(BigDecimal::zero(), |sum, enriched| sum + summary_principal(enriched));

    let mut allocations: Vec<CategoryAllocation> = group_values(assets, |a| Some(category_label(a)))
        .into_iter()
        .map(|(category_name, first, market_value)| CategoryAllocation {
            percentage: round2(percentage_of(&market_value, &total_value)),
            category_id: first.asset.category_id,
            category_name,
            color: first
                .asset
                .category_color
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            market_value,
        })
        .collect();
    allocations.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

    let total_profit = &total_value - &total_principal;
    DashboardSummary {
        profit_rate: round2(percentage_of(&total_profit, &total_principal)),
        total_value,
        total_principal,
        total_profit,
        asset_count: assets.len(),
        allocations,
        main_plan_id: main_plan.map(|p| p.id),
        main_plan_name: main_plan.map(|p| p.name.clone()),
        last_updated: Utc::now(),
    }
}

/// Buy or sell amounts that bring each category to its target weight.
///
/// Only assets with a category count towards a category; every asset counts
/// towards the total. Targets naming a category nobody holds report zero
/// current value under [`UNKNOWN_CATEGORY`].
pub fn calculate_category_rebalance(
    assets: &[EnrichedAsset],
    targets: &[CategoryTarget],
) -> CategoryRebalanceResponse {
    let total_value = total_market_value(assets);
    let held: HashMap<Uuid, (String, BigDecimal)> = group_values(assets, |a| a.asset.category_id)
        .into_iter()
        .map(|(category_id, first, value)| (category_id, (category_label(first), value)))
        .collect();

    let suggestions = targets
        .iter()
        .map(|target| {
            let (category_name, current_value) = held
                .get(&target.category_id)
                .cloned()
                .unwrap_or_else(|| (UNKNOWN_CATEGORY.to_string(), BigDecimal::zero()));
            let current_percentage = percentage_of(&current_value, &total_value);
            let difference = target.target_percentage - current_percentage;

            CategoryRebalanceSuggestion {
                category_id: target.category_id,
                category_name,
                current_value,
                current_percentage: round2(current_percentage),
                target_percentage: target.target_percentage,
                difference_percentage: round2(difference),
                suggested_amount: to_decimal(difference)
                    .map(|pct| share_of(&total_value, &pct))
                    .unwrap_or_else(BigDecimal::zero),
            }
        })
        .collect();

    CategoryRebalanceResponse { total_value, suggestions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::services::finance_service::enrich_asset;
    use crate::services::fx_cache::ExchangeRateCache;
    use crate::store::{AssetRepository, MemoryStore};
    use crate::test_support::{asset, quote, StubProvider};
    use std::sync::Arc;

    fn finance(provider: StubProvider) -> FinanceService {
        FinanceService::new(Arc::new(provider), ExchangeRateCache::new(), &Settings::for_tests())
    }

    fn create_input(name: &str, ticker: Option<&str>) -> CreateAsset {
        CreateAsset {
            portfolio_id: None,
            name: name.to_string(),
            ticker: ticker.map(String::from),
            asset_type: "stock".into(),
            category_id: None,
            quantity: BigDecimal::from(1),
            average_price: BigDecimal::from(100),
            currency: "krw".into(),
            current_value: None,
            purchase_exchange_rate: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_ticker() {
        let store = MemoryStore::new();
        let finance = finance(StubProvider::new());
        let err = create(&store, &finance, create_input("Ghost", Some("GHOST")), "KRW")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list_portfolios().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_uses_default_portfolio_and_normalizes() {
        let store = MemoryStore::new();
        let finance = finance(StubProvider::new().with_quote("AAPL", 200.0));
        let created = create(&store, &finance, create_input(" Apple ", Some("AAPL")), "KRW")
            .await
            .unwrap();
        assert_eq!(created.name, "Apple");
        assert_eq!(created.currency, "KRW");

        let listed = fetch_enriched(&store, &finance, None, false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].asset.portfolio_id, created.portfolio_id);
    }

    #[tokio::test]
    async fn test_soft_and_hard_delete() {
        let store = MemoryStore::new();
        let finance = finance(StubProvider::new());
        let created = create(&store, &finance, create_input("Deposit", None), "KRW").await.unwrap();

        delete(&store, created.id, false).await.unwrap();
        assert!(fetch_enriched(&store, &finance, None, false).await.unwrap().is_empty());
        assert_eq!(fetch_enriched(&store, &finance, None, true).await.unwrap().len(), 1);

        delete(&store, created.id, true).await.unwrap();
        assert!(matches!(delete(&store, created.id, true).await, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_summary_totals_and_categories() {
        let mut stock = asset("Samsung Electronics", Some("005930.KS"), 10, 60_000);
        stock.category_name = Some("주식".into());
        stock.category_color = Some("#ff0000".into());
        let mut cash = asset("CMA", None, 0, 0);
        cash.asset_type = "cash".into();
        cash.current_value = Some(BigDecimal::from(300_000));

        let assets = vec![
            enrich_asset(stock, Some(&quote("005930.KS", 70_000.0)), None, "KRW"),
            enrich_asset(cash, None, None, "KRW"),
        ];
        let summary = calculate_summary(&assets, None);

        assert_eq!(summary.total_value, BigDecimal::from(1_000_000));
        assert_eq!(summary.total_principal, BigDecimal::from(900_000));
        assert_eq!(summary.total_profit, BigDecimal::from(100_000));
        assert_eq!(summary.profit_rate, 11.11);
        assert_eq!(summary.asset_count, 2);
        assert_eq!(summary.allocations[0].category_name, "주식");
        assert_eq!(summary.allocations[0].percentage, 70.0);
        assert_eq!(summary.allocations[1].category_name, UNCATEGORIZED);
        assert_eq!(summary.allocations[1].color, DEFAULT_CATEGORY_COLOR);
        assert!(summary.main_plan_id.is_none());
    }

    #[test]
    fn test_category_rebalance_groups_by_category_id() {
        let stocks = Uuid::new_v4();
        let bonds = Uuid::new_v4();
        let mut samsung = asset("Samsung Electronics", Some("005930.KS"), 10, 60_000);
        samsung.category_id = Some(stocks);
        samsung.category_name = Some("주식".into());
        let mut bond = asset("KTB 3Y", None, 0, 0);
        bond.category_id = Some(bonds);
        bond.category_name = Some("채권".into());
        bond.current_value = Some(BigDecimal::from(200_000));
        let mut loose = asset("Wallet", None, 0, 0);
        loose.current_value = Some(BigDecimal::from(100_000));

        let assets = vec![
            enrich_asset(samsung, Some(&quote("005930.KS", 70_000.0)), None, "KRW"),
            enrich_asset(bond, None, None, "KRW"),
            enrich_asset(loose, None, None, "KRW"),
        ];
        let missing = Uuid::new_v4();
        let targets = vec![
            CategoryTarget { category_id: stocks, target_percentage: 50.0 },
            CategoryTarget { category_id: bonds, target_percentage: 40.0 },
            CategoryTarget { category_id: missing, target_percentage: 10.0 },
        ];

        let result = calculate_category_rebalance(&assets, &targets);
        assert_eq!(result.total_value, BigDecimal::from(1_000_000));

        let stock = &result.suggestions[0];
        assert_eq!(stock.category_name, "주식");
        assert_eq!(stock.current_value, BigDecimal::from(700_000));
        assert_eq!(stock.current_percentage, 70.0);
        assert_eq!(stock.difference_percentage, -20.0);
        assert_eq!(stock.suggested_amount, BigDecimal::from(-200_000));

        assert_eq!(result.suggestions[1].current_percentage, 20.0);
        assert_eq!(result.suggestions[1].suggested_amount, BigDecimal::from(200_000));

        let unknown = &result.suggestions[2];
        assert_eq!(unknown.category_name, UNKNOWN_CATEGORY);
        assert_eq!(unknown.current_value, BigDecimal::zero());
        assert_eq!(unknown.suggested_amount, BigDecimal::from(100_000));
    }

    #[test]
    fn test_category_target_range() {
        let target = |pct| CategoryTarget { category_id: Uuid::nil(), target_percentage: pct };
        assert!(target(0.0).validate().is_ok());
        assert!(target(100.0).validate().is_ok());
        assert!(target(100.5).validate().is_err());
        assert!(target(-1.0).validate().is_err());
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = calculate_summary(&[], None);
        assert_eq!(summary.total_value, BigDecimal::zero());
        assert_eq!(summary.profit_rate, 0.0);
        assert!(summary.allocations.is_empty());
    }
}
