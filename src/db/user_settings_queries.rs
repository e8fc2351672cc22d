use sqlx::PgPool;
use uuid::Uuid;
use crate::models::{UpdateUserSettings, UserSettings};

const COLUMNS: &str = "id, user_id, alert_threshold, calculator_tolerance, created_at, updated_at";

pub async fn fetch_for_user(pool: &PgPool, user_id: Uuid) -> Result<Option<UserSettings>, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!("SELECT {COLUMNS} FROM user_settings WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// A row that already exists for the user is returned untouched.
pub async fn insert(pool: &PgPool, settings: UserSettings) -> Result<UserSettings, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!(
        "INSERT INTO user_settings (id, user_id, alert_threshold, calculator_tolerance, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
         RETURNING {COLUMNS}"
    ))
    .bind(settings.id)
    .bind(settings.user_id)
    .bind(settings.alert_threshold)
    .bind(settings.calculator_tolerance)
    .bind(settings.created_at)
    .bind(settings.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    changes: &UpdateUserSettings,
) -> Result<Option<UserSettings>, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!(
        "UPDATE user_settings
         SET alert_threshold = COALESCE($2, alert_threshold),
             calculator_tolerance = COALESCE($3, calculator_tolerance),
             updated_at = NOW()
         WHERE user_id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(user_id)
    .bind(changes.alert_threshold)
    .bind(changes.calculator_tolerance)
    .fetch_optional(pool)
    .await
}
