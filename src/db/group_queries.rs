use sqlx::PgPool;
use uuid::Uuid;
use crate::models::{AllocationGroup, AllocationGroupItem};

pub async fn fetch_groups(pool: &PgPool, plan_id: Uuid) -> Result<Vec<AllocationGroup>, sqlx::Error> {
    sqlx::query_as::<_, AllocationGroup>(
        "SELECT id, plan_id, name, target_percentage, display_order, created_at
         FROM allocation_groups
         WHERE plan_id = $1
         ORDER BY display_order ASC, created_at ASC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_items(pool: &PgPool, group_ids: &[Uuid]) -> Result<Vec<AllocationGroupItem>, sqlx::Error> {
    sqlx::query_as::<_, AllocationGroupItem>(
        "SELECT id, group_id, asset_id, ticker, alias
         FROM allocation_group_items
         WHERE group_id = ANY($1)
         ORDER BY position ASC",
    )
    .bind(group_ids)
    .fetch_all(pool)
    .await
}

/// Items go with their groups (ON DELETE CASCADE).
pub async fn delete_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM allocation_groups WHERE plan_id = $1")
        .bind(plan_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_group(pool: &PgPool, group: &AllocationGroup) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO allocation_groups (id, plan_id, name, target_percentage, display_order, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(group.id)
    .bind(group.plan_id)
    .bind(&group.name)
    .bind(&group.target_percentage)
    .bind(group.display_order)
    .bind(group.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_item(pool: &PgPool, item: &AllocationGroupItem, position: i32) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO allocation_group_items (id, group_id, asset_id, ticker, alias, position)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(item.id)
    .bind(item.group_id)
    .bind(item.asset_id)
    .bind(&item.ticker)
    .bind(&item.alias)
    .bind(position)
    .execute(pool)
    .await?;
    Ok(())
}
