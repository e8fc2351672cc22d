use bigdecimal::{BigDecimal, Zero};
use chrono::{Datelike, Days, NaiveDate, Utc};
use futures::future::join_all;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    AssetHistory, BenchmarkResponse, CategoryRebalanceResponse, CategoryTarget, DashboardSummary,
    DeviationDirection, ExchangeRateResponse, GoalProgress, HistoryQuery, MarketIndicator,
    MarketIndicatorsResponse, PerformanceMetrics, PeriodReturn, PlanCalculation, RebalanceAlert,
    RebalanceAlertsResponse,
};
use crate::services::finance_service::FinanceService;
use crate::services::numeric::{round2, to_f64};
use crate::services::{asset_service, portfolio_service, rebalance_service, settings_service};
use crate::store::Store;

pub const DEFAULT_HISTORY_LIMIT: i64 = 365;
pub const DEFAULT_TICKER_HISTORY_DAYS: u32 = 30;
const DRAWDOWN_WINDOW_DAYS: u64 = 365;

/// Indices shown on the dashboard as `(ticker, name, currency)`.
pub const MARKET_INDICATORS: [(&str, &str, &str); 4] = [
    ("^KS11", "KOSPI", "KRW"),
    ("^GSPC", "S&P 500", "USD"),
    ("^IXIC", "NASDAQ", "USD"),
    ("^VIX", "VIX", ""),
];
const INDICATOR_HISTORY_DAYS: u32 = 2;

/// Look-back window for performance and benchmark figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
    YearToDate,
    OneYear,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::YearToDate,
        Period::OneYear,
    ];

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_uppercase().as_str() {
            "1M" => Ok(Period::OneMonth),
            "3M" => Ok(Period::ThreeMonths),
            "6M" => Ok(Period::SixMonths),
            "YTD" => Ok(Period::YearToDate),
            "1Y" => Ok(Period::OneYear),
            other => Err(AppError::Validation(format!("Unsupported period: {}", other))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::OneMonth => "1M",
            Period::ThreeMonths => "3M",
            Period::SixMonths => "6M",
            Period::YearToDate => "YTD",
            Period::OneYear => "1Y",
        }
    }

    /// First day of the window ending at `today`.
    pub fn start(&self, today: NaiveDate) -> NaiveDate {
        let days = match self {
            Period::OneMonth => 30,
            Period::ThreeMonths => 90,
            Period::SixMonths => 180,
            Period::YearToDate => today.ordinal0() as u64,
            Period::OneYear => 365,
        };
        today.checked_sub_days(Days::new(days)).unwrap_or(today)
    }
}

pub async fn summary(
    store: &dyn Store,
    finance: &FinanceService,
    portfolio_id: Option<Uuid>,
) -> Result<DashboardSummary, AppError> {
    let assets = asset_service::fetch_enriched(store, finance, portfolio_id, false).await?;
    let main_plan = rebalance_service::find_main_plan(store, portfolio_id).await?;
    Ok(asset_service::calculate_summary(&assets, main_plan.as_ref()))
}

pub async fn history(store: &dyn Store, query: HistoryQuery) -> Result<Vec<AssetHistory>, AppError> {
    let Some(portfolio) = portfolio_service::resolve(store, query.portfolio_id).await? else {
        return Ok(Vec::new());
    };
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 3650);
    store
        .list_history(portfolio.id, query.start_date, query.end_date, limit)
        .await
}

pub async fn exchange_rate(
    finance: &FinanceService,
    from: &str,
    to: &str,
) -> Result<ExchangeRateResponse, AppError> {
    let rate = finance
        .exchange_rate(from, to)
        .await
        .ok_or_else(|| AppError::External(format!("No exchange rate available for {}/{}", from, to)))?;
    Ok(ExchangeRateResponse {
        rate,
        from_currency: from.to_uppercase(),
        to_currency: to.to_uppercase(),
        timestamp: Utc::now(),
    })
}

/// Category weights against `targets`, over the resolved portfolio's active assets.
pub async fn category_rebalance(
    store: &dyn Store,
    finance: &FinanceService,
    portfolio_id: Option<Uuid>,
    targets: Vec<CategoryTarget>,
) -> Result<CategoryRebalanceResponse, AppError> {
    targets.iter().try_for_each(CategoryTarget::validate)?;
    let assets = asset_service::fetch_enriched(store, finance, portfolio_id, false).await?;
    Ok(asset_service::calculate_category_rebalance(&assets, &targets))
}

/// Latest close and short-term change of each index, then USD/KRW.
/// Anything the provider cannot supply is left out.
pub async fn market_indicators(finance: &FinanceService) -> MarketIndicatorsResponse {
    let histories = join_all(
        MARKET_INDICATORS
            .iter()
            .map(|(ticker, _, _)| finance.ticker_history(ticker, INDICATOR_HISTORY_DAYS)),
    )
    .await;

    let mut indicators: Vec<MarketIndicator> = MARKET_INDICATORS
        .iter()
        .zip(histories)
        .filter_map(|((ticker, name, currency), history)| {
            let latest = history.data.last()?;
            Some(MarketIndicator {
                ticker: ticker.to_string(),
                name: name.to_string(),
                price: latest.close,
                change_rate: history.change_rate,
                currency: currency.to_string(),
            })
        })
        .collect();

    match finance.exchange_rate("USD", "KRW").await {
        Some(rate) => indicators.push(MarketIndicator {
            ticker: "USDKRW=X".to_string(),
            name: "USD/KRW".to_string(),
            price: to_f64(&rate),
            change_rate: 0.0,
            currency: "KRW".to_string(),
        }),
        None => warn!("USD/KRW unavailable, leaving it out of market indicators"),
    }

    MarketIndicatorsResponse { indicators, timestamp: Utc::now() }
}

pub async fn benchmark(finance: &FinanceService, ticker: &str, period: Period) -> BenchmarkResponse {
    let today = Utc::now().date_naive();
    finance.benchmark_history(ticker, period.start(today), today).await
}

pub async fn performance(store: &dyn Store, portfolio_id: Option<Uuid>) -> Result<PerformanceMetrics, AppError> {
    let today = Utc::now().date_naive();
    let Some(portfolio) = portfolio_service::resolve(store, portfolio_id).await? else {
        return Ok(performance_metrics(&[], today));
    };
    let start = today.checked_sub_days(Days::new(DRAWDOWN_WINDOW_DAYS)).unwrap_or(today);
    let rows = store
        .list_history(portfolio.id, Some(start), Some(today), DRAWDOWN_WINDOW_DAYS as i64 + 1)
        .await?;
    Ok(performance_metrics(&rows, today))
}

/// Without an explicit `threshold` the user's stored alert threshold applies.
pub async fn rebalance_alerts(
    store: &dyn Store,
    finance: &FinanceService,
    portfolio_id: Option<Uuid>,
    threshold: Option<f64>,
) -> Result<RebalanceAlertsResponse, AppError> {
    let threshold = match threshold {
        Some(t) if !t.is_finite() || t < 0.0 => {
            return Err(AppError::Validation("threshold must be a non-negative number".into()))
        }
        Some(t) => t,
        None => settings_service::fetch(store).await?.alert_threshold,
    };
    let calculation = match rebalance_service::find_main_plan(store, portfolio_id).await? {
        Some(plan) => Some(rebalance_service::calculate_for_plan(store, finance, plan.id, Some(plan.portfolio_id)).await?),
        None => None,
    };
    Ok(build_alerts(calculation.as_ref(), threshold))
}

pub async fn goal_progress(
    store: &dyn Store,
    finance: &FinanceService,
    portfolio_id: Option<Uuid>,
) -> Result<GoalProgress, AppError> {
    let target = portfolio_service::resolve(store, portfolio_id)
        .await?
        .and_then(|p| p.target_value);
    let summary = summary(store, finance, portfolio_id).await?;
    Ok(calculate_goal(target.as_ref(), &summary.total_value))
}

fn period_return(period: Period, rows: &[AssetHistory], today: NaiveDate) -> PeriodReturn {
    let start = period.start(today);
    let in_window: Vec<&AssetHistory> = rows.iter().filter(|r| r.snapshot_date >= start).collect();

    let (first, last) = match (in_window.first(), in_window.last()) {
        (Some(first), Some(last)) if in_window.len() >= 2 => (*first, *last),
        _ => {
            return PeriodReturn {
                period: period.label().to_string(),
                return_rate: None,
                start_value: None,
                end_value: None,
            }
        }
    };

    let start_value = to_f64(&first.total_value);
    let return_rate = (start_value > 0.0)
        .then(|| round2((to_f64(&last.total_value) - start_value) / start_value * 100.0));

    PeriodReturn {
        period: period.label().to_string(),
        return_rate,
        start_value: Some(first.total_value.clone()),
        end_value: Some(last.total_value.clone()),
    }
}

/// Period returns from snapshot rows (ascending by date) and the worst
/// peak-to-trough fall over the last year.
pub fn performance_metrics(rows: &[AssetHistory], today: NaiveDate) -> PerformanceMetrics {
    let period_returns = Period::ALL
        .iter()
        .map(|period| period_return(*period, rows, today))
        .collect();

    let window_start = today.checked_sub_days(Days::new(DRAWDOWN_WINDOW_DAYS)).unwrap_or(today);
    let window: Vec<&AssetHistory> = rows.iter().filter(|r| r.snapshot_date >= window_start).collect();
    if window.len() < 2 {
        return PerformanceMetrics {
            period_returns,
            max_drawdown: None,
            max_drawdown_period: None,
            current_drawdown: None,
        };
    }

    let mut peak = to_f64(&window[0].total_value);
    let mut peak_date = window[0].snapshot_date;
    let mut max_drawdown = 0.0_f64;
    let mut max_period = None;

    for row in &window {
        let value = to_f64(&row.total_value);
        if value > peak {
            peak = value;
            peak_date = row.snapshot_date;
        }
        if peak > 0.0 {
            let drawdown = (peak - value) / peak * 100.0;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
                max_period = Some(format!("{} ~ {}", peak_date, row.snapshot_date));
            }
        }
    }

    let last = window.last().map(|r| to_f64(&r.total_value)).unwrap_or(0.0);
    let current_drawdown = if peak > 0.0 { (peak - last) / peak * 100.0 } else { 0.0 };

    PerformanceMetrics {
        period_returns,
        max_drawdown: Some(round2(max_drawdown)),
        max_drawdown_period: max_period,
        current_drawdown: Some(round2(current_drawdown)),
    }
}

/// Targets whose absolute deviation reaches `threshold` percentage points,
/// largest first. Without a calculation nothing is flagged.
pub fn build_alerts(calculation: Option<&PlanCalculation>, threshold: f64) -> RebalanceAlertsResponse {
    let mut alerts: Vec<RebalanceAlert> = Vec::new();

    if let Some(calculation) = calculation {
        let individual = calculation
            .suggestions
            .iter()
            .map(|s| (s.asset_name.clone(), s.current_percentage, s.target_percentage));
        let grouped = calculation
            .group_suggestions
            .iter()
            .map(|g| (g.group_name.clone(), g.current_percentage, g.target_percentage));

        for (name, current, target) in individual.chain(grouped) {
            let deviation = (target - current).abs();
            if deviation >= threshold {
                alerts.push(RebalanceAlert {
                    category_name: name,
                    current_percentage: round2(current),
                    target_percentage: round2(target),
                    deviation: round2(deviation),
                    direction: if current > target { DeviationDirection::Over } else { DeviationDirection::Under },
                });
            }
        }
    }

    alerts.sort_by(|a, b| b.deviation.total_cmp(&a.deviation));
    RebalanceAlertsResponse {
        needs_rebalancing: !alerts.is_empty(),
        alerts,
        threshold,
    }
}

pub fn calculate_goal(target: Option<&BigDecimal>, current: &BigDecimal) -> GoalProgress {
    let zero = BigDecimal::zero();
    let target = target.cloned().unwrap_or_else(BigDecimal::zero);
    if target <= zero {
        return GoalProgress {
            target_value: target,
            current_value: current.clone(),
            progress_percentage: 0.0,
            remaining_amount: zero,
            is_achieved: false,
        };
    }

    let remaining = &target - current;
    GoalProgress {
        progress_percentage: round2(to_f64(current) / to_f64(&target) * 100.0),
        remaining_amount: if remaining < zero { zero } else { remaining },
        is_achieved: *current >= target,
        current_value: current.clone(),
        target_value: target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::AllocationSuggestion;
    use crate::services::fx_cache::ExchangeRateCache;
    use crate::models::{AllocationInput, CreatePlan, UpdateUserSettings};
    use crate::store::{AssetRepository, MemoryStore};
    use crate::test_support::{asset, StubProvider};
    use std::sync::Arc;

    fn finance(provider: StubProvider) -> FinanceService {
        FinanceService::new(Arc::new(provider), ExchangeRateCache::new(), &Settings::for_tests())
    }

    fn row(date: NaiveDate, value: i64) -> AssetHistory {
        AssetHistory {
            id: Uuid::new_v4(),
            portfolio_id: Uuid::nil(),
            snapshot_date: date,
            total_value: BigDecimal::from(value),
            total_principal: BigDecimal::zero(),
            total_profit: BigDecimal::zero(),
            profit_rate: None,
            category_breakdown: None,
            created_at: Utc::now(),
        }
    }

    fn days_ago(today: NaiveDate, n: u64) -> NaiveDate {
        today.checked_sub_days(Days::new(n)).unwrap()
    }

    fn suggestion(name: &str, current: f64, target: f64) -> AllocationSuggestion {
        AllocationSuggestion {
            asset_id: None,
            asset_name: name.to_string(),
            ticker: None,
            alias: None,
            current_value: BigDecimal::zero(),
            current_percentage: current,
            target_percentage: target,
            difference_percentage: target - current,
            target_value: BigDecimal::zero(),
            suggested_amount: BigDecimal::zero(),
            suggested_quantity: None,
            is_matched: true,
        }
    }

    #[test]
    fn test_period_parse() {
        assert_eq!(Period::parse("ytd").unwrap(), Period::YearToDate);
        assert!(Period::parse("2W").is_err());
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(Period::YearToDate.start(today), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(Period::OneMonth.start(today), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn test_period_returns_need_two_rows() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let rows = vec![row(days_ago(today, 100), 1_000), row(days_ago(today, 20), 1_100), row(today, 1_210)];
        let metrics = performance_metrics(&rows, today);

        let one_month = &metrics.period_returns[0];
        assert_eq!(one_month.period, "1M");
        assert_eq!(one_month.return_rate, Some(10.0));

        let six_months = &metrics.period_returns[2];
        assert_eq!(six_months.return_rate, Some(21.0));

        let single = performance_metrics(&[row(today, 1_000)], today);
        assert!(single.period_returns.iter().all(|p| p.return_rate.is_none()));
        assert!(single.max_drawdown.is_none());
    }

    #[test]
    fn test_max_drawdown_tracks_running_peak() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let rows = vec![
            row(days_ago(today, 40), 1_000),
            row(days_ago(today, 30), 1_200),
            row(days_ago(today, 20), 900),
            row(days_ago(today, 10), 1_100),
            row(today, 1_080),
        ];
        let metrics = performance_metrics(&rows, today);
        assert_eq!(metrics.max_drawdown, Some(25.0));
        assert_eq!(
            metrics.max_drawdown_period.as_deref(),
            Some(format!("{} ~ {}", days_ago(today, 30), days_ago(today, 20)).as_str())
        );
        assert_eq!(metrics.current_drawdown, Some(10.0));
    }

    #[test]
    fn test_alerts_filter_and_sort_by_deviation() {
        let calculation = PlanCalculation {
            plan_id: Uuid::new_v4(),
            plan_name: "Main".into(),
            total_value: BigDecimal::from(100),
            suggestions: vec![
                suggestion("Apple", 30.0, 20.0),
                suggestion("Samsung", 18.0, 20.0),
                suggestion("Bonds", 10.0, 25.0),
            ],
            group_suggestions: vec![],
        };

        let response = build_alerts(Some(&calculation), 5.0);
        assert!(response.needs_rebalancing);
        let names: Vec<_> = response.alerts.iter().map(|a| a.category_name.as_str()).collect();
        assert_eq!(names, vec!["Bonds", "Apple"]);
        assert_eq!(response.alerts[0].direction, DeviationDirection::Under);
        assert_eq!(response.alerts[1].direction, DeviationDirection::Over);

        let none = build_alerts(None, 5.0);
        assert!(!none.needs_rebalancing);
        assert!(none.alerts.is_empty());
    }

    #[test]
    fn test_goal_progress() {
        let goal = calculate_goal(Some(&BigDecimal::from(1_000)), &BigDecimal::from(250));
        assert_eq!(goal.progress_percentage, 25.0);
        assert_eq!(goal.remaining_amount, BigDecimal::from(750));
        assert!(!goal.is_achieved);

        let done = calculate_goal(Some(&BigDecimal::from(1_000)), &BigDecimal::from(1_500));
        assert_eq!(done.remaining_amount, BigDecimal::zero());
        assert!(done.is_achieved);

        let unset = calculate_goal(None, &BigDecimal::from(1_500));
        assert_eq!(unset.progress_percentage, 0.0);
        assert!(!unset.is_achieved);
    }

    #[tokio::test]
    async fn test_market_indicators_skip_missing_series() {
        let today = Utc::now().date_naive();
        let provider = StubProvider::new()
            .with_history("^KS11", vec![(days_ago(today, 1), 2500.0), (today, 2550.0)])
            .with_history("^GSPC", vec![(today, 5000.0)])
            .with_quote("USDKRW=X", 1380.5);

        let result = market_indicators(&finance(provider)).await;
        let tickers: Vec<_> = result.indicators.iter().map(|i| i.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["^KS11", "^GSPC", "USDKRW=X"]);

        let kospi = &result.indicators[0];
        assert_eq!(kospi.name, "KOSPI");
        assert_eq!(kospi.price, 2550.0);
        assert_eq!(kospi.change_rate, 2.0);
        assert_eq!(kospi.currency, "KRW");
        assert_eq!(result.indicators[1].change_rate, 0.0);

        let fx = &result.indicators[2];
        assert_eq!(fx.name, "USD/KRW");
        assert_eq!(fx.price, 1380.5);
        assert_eq!(fx.change_rate, 0.0);
    }

    #[tokio::test]
    async fn test_market_indicators_fall_back_to_configured_rate() {
        let result = market_indicators(&finance(StubProvider::new())).await;
        assert_eq!(result.indicators.len(), 1);
        assert_eq!(result.indicators[0].ticker, "USDKRW=X");
        assert_eq!(result.indicators[0].price, 1350.0);
    }

    #[tokio::test]
    async fn test_category_rebalance_rejects_out_of_range_target() {
        let store = MemoryStore::new();
        let targets = vec![CategoryTarget { category_id: Uuid::new_v4(), target_percentage: 120.0 }];
        let err = category_rebalance(&store, &finance(StubProvider::new()), None, targets)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_category_rebalance_without_portfolio_is_zero() {
        let store = MemoryStore::new();
        let targets = vec![CategoryTarget { category_id: Uuid::new_v4(), target_percentage: 30.0 }];
        let result = category_rebalance(&store, &finance(StubProvider::new()), None, targets)
            .await
            .unwrap();
        assert_eq!(result.total_value, BigDecimal::zero());
        assert_eq!(result.suggestions[0].category_name, "알 수 없음");
        assert_eq!(result.suggestions[0].suggested_amount, BigDecimal::zero());
    }

    async fn seed_main_plan(store: &MemoryStore) {
        let plan = rebalance_service::create_plan(
            store,
            CreatePlan {
                portfolio_id: None,
                name: "Core".into(),
                description: None,
                strategy_prompt: None,
                is_main: true,
                allocations: vec![AllocationInput {
                    asset_id: None,
                    ticker: Some("005930.KS".into()),
                    alias: None,
                    display_name: None,
                    target_percentage: BigDecimal::from(50),
                }],
            },
            "KRW",
        )
        .await
        .unwrap();

        let mut samsung = asset("Samsung Electronics", Some("005930.KS"), 10, 60_000);
        samsung.portfolio_id = plan.plan.portfolio_id;
        store.insert_asset(samsung).await.unwrap();
        let mut deposit = asset("CMA", None, 0, 0);
        deposit.portfolio_id = plan.plan.portfolio_id;
        deposit.current_value = Some(BigDecimal::from(300_000));
        store.insert_asset(deposit).await.unwrap();
    }

    #[tokio::test]
    async fn test_alerts_default_to_stored_threshold() {
        let store = MemoryStore::new();
        let finance = finance(StubProvider::new().with_quote("005930.KS", 70_000.0));
        seed_main_plan(&store).await;

        let alerts = rebalance_alerts(&store, &finance, None, None).await.unwrap();
        assert_eq!(alerts.threshold, 5.0);
        assert_eq!(alerts.alerts.len(), 1);
        assert_eq!(alerts.alerts[0].deviation, 20.0);

        let changes = UpdateUserSettings { alert_threshold: Some(25.0), calculator_tolerance: None };
        settings_service::update(&store, changes).await.unwrap();
        let alerts = rebalance_alerts(&store, &finance, None, None).await.unwrap();
        assert_eq!(alerts.threshold, 25.0);
        assert!(!alerts.needs_rebalancing);

        let alerts = rebalance_alerts(&store, &finance, None, Some(10.0)).await.unwrap();
        assert_eq!(alerts.threshold, 10.0);
        assert!(alerts.needs_rebalancing);
    }

    #[tokio::test]
    async fn test_alerts_reject_negative_threshold() {
        let store = MemoryStore::new();
        let err = rebalance_alerts(&store, &finance(StubProvider::new()), None, Some(-1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
