use sqlx::PgPool;
use uuid::Uuid;
use crate::models::RebalancePlan;

const COLUMNS: &str =
    "id, portfolio_id, name, description, strategy_prompt, is_main, is_active, created_at, updated_at";

pub async fn fetch_all(
    pool: &PgPool,
    portfolio_id: Option<Uuid>,
    include_inactive: bool,
) -> Result<Vec<RebalancePlan>, sqlx::Error> {
    sqlx::query_as::<_, RebalancePlan>(&format!(
        "SELECT {COLUMNS} FROM rebalance_plans
         WHERE ($1::uuid IS NULL OR portfolio_id = $1) AND ($2 OR is_active)
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(portfolio_id)
    .bind(include_inactive)
    .fetch_all(pool)
    .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<RebalancePlan>, sqlx::Error> {
    sqlx::query_as::<_, RebalancePlan>(&format!("SELECT {COLUMNS} FROM rebalance_plans WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_main(pool: &PgPool, portfolio_id: Uuid) -> Result<Option<RebalancePlan>, sqlx::Error> {
    sqlx::query_as::<_, RebalancePlan>(&format!(
        "SELECT {COLUMNS} FROM rebalance_plans
         WHERE portfolio_id = $1 AND is_main AND is_active
         ORDER BY updated_at DESC
         LIMIT 1"
    ))
    .bind(portfolio_id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(pool: &PgPool, plan: RebalancePlan) -> Result<RebalancePlan, sqlx::Error> {
    sqlx::query_as::<_, RebalancePlan>(&format!(
        "INSERT INTO rebalance_plans ({COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {COLUMNS}"
    ))
    .bind(plan.id)
    .bind(plan.portfolio_id)
    .bind(plan.name)
    .bind(plan.description)
    .bind(plan.strategy_prompt)
    .bind(plan.is_main)
    .bind(plan.is_active)
    .bind(plan.created_at)
    .bind(plan.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, plan: RebalancePlan) -> Result<Option<RebalancePlan>, sqlx::Error> {
    sqlx::query_as::<_, RebalancePlan>(&format!(
        "UPDATE rebalance_plans
         SET name = $2, description = $3, strategy_prompt = $4, is_main = $5,
             is_active = $6, updated_at = $7
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(plan.id)
    .bind(plan.name)
    .bind(plan.description)
    .bind(plan.strategy_prompt)
    .bind(plan.is_main)
    .bind(plan.is_active)
    .bind(plan.updated_at)
    .fetch_optional(pool)
    .await
}

pub async fn clear_main(pool: &PgPool, portfolio_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE rebalance_plans SET is_main = FALSE, updated_at = NOW()
         WHERE portfolio_id = $1 AND is_main",
    )
    .bind(portfolio_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
