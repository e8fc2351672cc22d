use sqlx::PgPool;
use uuid::Uuid;
use crate::models::Asset;

// Assets are always read joined with their category for display.
const SELECT_JOINED: &str = "
    SELECT a.id, a.portfolio_id, a.name, a.ticker, a.asset_type, a.category_id,
           c.name AS category_name, c.color AS category_color,
           a.quantity, a.average_price, a.currency, a.current_value,
           a.purchase_exchange_rate, a.notes, a.is_active, a.created_at, a.updated_at
    FROM assets a
    LEFT JOIN asset_categories c ON c.id = a.category_id";

pub async fn fetch_for_portfolio(
    pool: &PgPool,
    portfolio_id: Uuid,
    include_inactive: bool,
) -> Result<Vec<Asset>, sqlx::Error> {
    sqlx::query_as::<_, Asset>(&format!(
        "{SELECT_JOINED}
         WHERE a.portfolio_id = $1 AND ($2 OR a.is_active)
         ORDER BY a.created_at ASC, a.id ASC"
    ))
    .bind(portfolio_id)
    .bind(include_inactive)
    .fetch_all(pool)
    .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Asset>, sqlx::Error> {
    sqlx::query_as::<_, Asset>(&format!("{SELECT_JOINED} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &PgPool, asset: Asset) -> Result<Asset, sqlx::Error> {
    sqlx::query(
        "INSERT INTO assets (id, portfolio_id, name, ticker, asset_type, category_id, quantity,
                             average_price, currency, current_value, purchase_exchange_rate,
                             notes, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(asset.id)
    .bind(asset.portfolio_id)
    .bind(&asset.name)
    .bind(&asset.ticker)
    .bind(&asset.asset_type)
    .bind(asset.category_id)
    .bind(&asset.quantity)
    .bind(&asset.average_price)
    .bind(&asset.currency)
    .bind(&asset.current_value)
    .bind(&asset.purchase_exchange_rate)
    .bind(&asset.notes)
    .bind(asset.is_active)
    .bind(asset.created_at)
    .bind(asset.updated_at)
    .execute(pool)
    .await?;

    fetch_one(pool, asset.id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn update(pool: &PgPool, asset: Asset) -> Result<Option<Asset>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE assets
         SET name = $2, ticker = $3, asset_type = $4, category_id = $5, quantity = $6,
             average_price = $7, currency = $8, current_value = $9,
             purchase_exchange_rate = $10, notes = $11, is_active = $12, updated_at = $13
         WHERE id = $1",
    )
    .bind(asset.id)
    .bind(&asset.name)
    .bind(&asset.ticker)
    .bind(&asset.asset_type)
    .bind(asset.category_id)
    .bind(&asset.quantity)
    .bind(&asset.average_price)
    .bind(&asset.currency)
    .bind(&asset.current_value)
    .bind(&asset.purchase_exchange_rate)
    .bind(&asset.notes)
    .bind(asset.is_active)
    .bind(asset.updated_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_one(pool, asset.id).await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assets WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
