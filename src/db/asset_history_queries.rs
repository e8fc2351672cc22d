use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;
use crate::models::{AssetHistory, NewAssetSnapshot};

const COLUMNS: &str = "id, portfolio_id, snapshot_date, total_value, total_principal, total_profit,
                       profit_rate, category_breakdown, created_at";

pub async fn upsert(pool: &PgPool, snapshot: NewAssetSnapshot) -> Result<AssetHistory, sqlx::Error> {
    sqlx::query_as::<_, AssetHistory>(&format!(
        "INSERT INTO asset_history
            (id, portfolio_id, snapshot_date, total_value, total_principal, total_profit,
             profit_rate, category_breakdown)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (portfolio_id, snapshot_date) DO UPDATE
         SET total_value = EXCLUDED.total_value,
             total_principal = EXCLUDED.total_principal,
             total_profit = EXCLUDED.total_profit,
             profit_rate = EXCLUDED.profit_rate,
             category_breakdown = EXCLUDED.category_breakdown,
             created_at = NOW()
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(snapshot.portfolio_id)
    .bind(snapshot.snapshot_date)
    .bind(snapshot.total_value)
    .bind(snapshot.total_principal)
    .bind(snapshot.total_profit)
    .bind(snapshot.profit_rate)
    .bind(snapshot.category_breakdown)
    .fetch_one(pool)
    .await
}

/// The most recent `limit` rows in range, returned oldest first.
pub async fn fetch_range(
    pool: &PgPool,
    portfolio_id: Uuid,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    limit: i64,
) -> Result<Vec<AssetHistory>, sqlx::Error> {
    sqlx::query_as::<_, AssetHistory>(&format!(
        "SELECT {COLUMNS} FROM (
             SELECT {COLUMNS} FROM asset_history
             WHERE portfolio_id = $1
               AND ($2::date IS NULL OR snapshot_date >= $2)
               AND ($3::date IS NULL OR snapshot_date <= $3)
             ORDER BY snapshot_date DESC
             LIMIT $4
         ) recent
         ORDER BY snapshot_date ASC"
    ))
    .bind(portfolio_id)
    .bind(start)
    .bind(end)
    .bind(limit)
    .fetch_all(pool)
    .await
}
