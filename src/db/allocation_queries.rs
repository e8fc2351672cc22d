use sqlx::PgPool;
use uuid::Uuid;
use crate::models::PlanAllocation;

pub async fn fetch_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlanAllocation>, sqlx::Error> {
    sqlx::query_as::<_, PlanAllocation>(
        "SELECT id, plan_id, asset_id, ticker, alias, display_name, target_percentage, created_at
         FROM plan_allocations
         WHERE plan_id = $1
         ORDER BY position ASC, created_at ASC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM plan_allocations WHERE plan_id = $1")
        .bind(plan_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert(pool: &PgPool, allocation: &PlanAllocation, position: i32) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO plan_allocations
            (id, plan_id, asset_id, ticker, alias, display_name, target_percentage, position, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(allocation.id)
    .bind(allocation.plan_id)
    .bind(allocation.asset_id)
    .bind(&allocation.ticker)
    .bind(&allocation.alias)
    .bind(&allocation.display_name)
    .bind(&allocation.target_percentage)
    .bind(position)
    .bind(allocation.created_at)
    .execute(pool)
    .await?;
    Ok(())
}
