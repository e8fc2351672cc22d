use sqlx::PgPool;
use uuid::Uuid;
use crate::models::{Portfolio, UpdatePortfolio};

const COLUMNS: &str = "id, name, description, base_currency, target_value, created_at";

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "SELECT {COLUMNS} FROM portfolios ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!("SELECT {COLUMNS} FROM portfolios WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_by_name(pool: &PgPool, name: &str) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "SELECT {COLUMNS} FROM portfolios WHERE name = $1 ORDER BY created_at ASC LIMIT 1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn insert(pool: &PgPool, input: Portfolio) -> Result<Portfolio, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "INSERT INTO portfolios (id, name, description, base_currency, target_value, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {COLUMNS}"
    ))
    .bind(input.id)
    .bind(input.name)
    .bind(input.description)
    .bind(input.base_currency)
    .bind(input.target_value)
    .bind(input.created_at)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, id: Uuid, input: UpdatePortfolio) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "UPDATE portfolios
         SET name = COALESCE($2, name),
             description = COALESCE($3, description),
             base_currency = COALESCE($4, base_currency),
             target_value = COALESCE($5, target_value)
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(input.name)
    .bind(input.description)
    .bind(input.base_currency)
    .bind(input.target_value)
    .fetch_optional(pool)
    .await
}

/// Assets, plans and history go with it (ON DELETE CASCADE).
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM portfolios WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
