//! Daily Snapshot Background Job
//!
//! Runs once a day at `SNAPSHOT_HOUR:SNAPSHOT_MINUTE` in the configured
//! timezone and can be triggered on demand through `POST /jobs/snapshot`.
//!
//! # Data Created
//!
//! 1. One `asset_history` row per portfolio for today: total value, principal,
//!    profit, profit rate and a category breakdown (category name -> value).
//!    Re-running on the same day overwrites the row.
//! 2. The latest close of each benchmark index in `benchmark_history`.
//!
//! # Error Handling
//!
//! A failing portfolio or benchmark is logged and counted as failed; the
//! remaining items are still processed.

use bigdecimal::BigDecimal;
use chrono::{Days, Utc};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{DashboardSummary, NewAssetSnapshot, Portfolio};
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::{asset_service, numeric::to_decimal};

pub const BENCHMARK_TICKERS: [&str; 3] = ["^KS11", "^GSPC", "^IXIC"];

/// Look-back so the latest close is found across weekends and holidays.
const BENCHMARK_LOOKBACK_DAYS: u64 = 7;

pub async fn record_daily_snapshots(ctx: JobContext) -> Result<JobResult, AppError> {
    info!("📸 Starting daily snapshot job");

    let today = Utc::now().with_timezone(&ctx.settings.timezone).date_naive();
    let portfolios = ctx.store.list_portfolios().await?;

    let mut processed = 0;
    let mut failed = 0;

    for portfolio in &portfolios {
        match snapshot_portfolio(&ctx, portfolio, today).await {
            Ok(summary) => {
                info!(
                    "✅ Snapshot for portfolio {} on {}: {} {}",
                    portfolio.name, today, summary.total_value, portfolio.base_currency
                );
                processed += 1;
            }
            Err(e) => {
                error!("❌ Failed to snapshot portfolio {}: {}", portfolio.id, e);
                failed += 1;
            }
        }
    }

    for ticker in BENCHMARK_TICKERS {
        match record_benchmark_close(&ctx, ticker, today).await {
            Ok(true) => processed += 1,
            Ok(false) => {
                warn!("⚠️  No recent close for benchmark {}", ticker);
                failed += 1;
            }
            Err(e) => {
                error!("❌ Failed to record benchmark {}: {}", ticker, e);
                failed += 1;
            }
        }
    }

    info!(
        "✅ Daily snapshot job completed: {} items processed, {} failed",
        processed, failed
    );
    Ok(JobResult { items_processed: processed, items_failed: failed })
}

async fn snapshot_portfolio(
    ctx: &JobContext,
    portfolio: &Portfolio,
    today: chrono::NaiveDate,
) -> Result<DashboardSummary, AppError> {
    let assets = ctx.store.list_assets(portfolio.id, false).await?;
    let enriched = ctx.finance.enrich_assets(assets, &portfolio.base_currency).await;
    let main_plan = ctx.store.find_main_plan(portfolio.id).await?;
    let summary = asset_service::calculate_summary(&enriched, main_plan.as_ref());

    ctx.store
        .upsert_snapshot(NewAssetSnapshot {
            portfolio_id: portfolio.id,
            snapshot_date: today,
            total_value: summary.total_value.clone(),
            total_principal: summary.total_principal.clone(),
            total_profit: summary.total_profit.clone(),
            profit_rate: summary.profit_rate,
            category_breakdown: category_breakdown(&summary),
        })
        .await?;
    Ok(summary)
}

pub fn category_breakdown(summary: &DashboardSummary) -> Value {
    let map: Map<String, Value> = summary
        .allocations
        .iter()
        .map(|a| (a.category_name.clone(), Value::String(a.market_value.to_string())))
        .collect();
    Value::Object(map)
}

/// Stores the most recent close up to `today`. `Ok(false)` when the provider had none.
async fn record_benchmark_close(ctx: &JobContext, ticker: &str, today: chrono::NaiveDate) -> Result<bool, AppError> {
    let start = today.checked_sub_days(Days::new(BENCHMARK_LOOKBACK_DAYS)).unwrap_or(today);
    let history = ctx.finance.benchmark_history(ticker, start, today).await;

    let Some(last) = history.data.last() else {
        return Ok(false);
    };
    let close: BigDecimal = match to_decimal(last.close) {
        Some(close) => close,
        None => return Ok(false),
    };

    ctx.store.upsert_benchmark_close(ticker, last.date, close).await?;
    Ok(true)
}
