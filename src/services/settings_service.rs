use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{UpdateUserSettings, UserSettings};
use crate::store::Store;

/// The app serves a single user.
pub const DEFAULT_USER_ID: Uuid = Uuid::from_u128(1);

/// Stored settings, created with defaults on first read.
pub async fn fetch(store: &dyn Store) -> Result<UserSettings, AppError> {
    if let Some(settings) = store.get_user_settings(DEFAULT_USER_ID).await? {
        return Ok(settings);
    }
    let created = store
        .insert_user_settings(UserSettings::defaults(DEFAULT_USER_ID))
        .await?;
    info!("Created default settings for user {}", DEFAULT_USER_ID);
    Ok(created)
}

pub async fn update(store: &dyn Store, changes: UpdateUserSettings) -> Result<UserSettings, AppError> {
    changes.validate()?;
    if let Some(updated) = store.update_user_settings(DEFAULT_USER_ID, &changes).await? {
        return Ok(updated);
    }

    let mut settings = UserSettings::defaults(DEFAULT_USER_ID);
    settings.apply(&changes);
    let created = store.insert_user_settings(settings).await?;
    info!("Created settings for user {} from first update", DEFAULT_USER_ID);
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_ALERT_THRESHOLD, DEFAULT_CALCULATOR_TOLERANCE};
    use crate::store::{MemoryStore, SettingsRepository};

    #[test]
    fn test_default_user_id() {
        assert_eq!(DEFAULT_USER_ID.to_string(), "00000000-0000-0000-0000-000000000001");
    }

    #[tokio::test]
    async fn test_first_read_creates_defaults_once() {
        let store = MemoryStore::new();
        assert!(store.get_user_settings(DEFAULT_USER_ID).await.unwrap().is_none());

        let first = fetch(&store).await.unwrap();
        assert_eq!(first.alert_threshold, DEFAULT_ALERT_THRESHOLD);
        assert_eq!(first.calculator_tolerance, DEFAULT_CALCULATOR_TOLERANCE);

        let second = fetch(&store).await.unwrap();
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_update_without_row_starts_from_defaults() {
        let store = MemoryStore::new();
        let changes = UpdateUserSettings { alert_threshold: Some(8.0), calculator_tolerance: None };

        let saved = update(&store, changes).await.unwrap();
        assert_eq!(saved.alert_threshold, 8.0);
        assert_eq!(saved.calculator_tolerance, DEFAULT_CALCULATOR_TOLERANCE);

        let changes = UpdateUserSettings { alert_threshold: None, calculator_tolerance: Some(2.5) };
        let saved = update(&store, changes).await.unwrap();
        assert_eq!(saved.alert_threshold, 8.0);
        assert_eq!(saved.calculator_tolerance, 2.5);
        assert_eq!(fetch(&store).await.unwrap().id, saved.id);
    }

    #[tokio::test]
    async fn test_update_rejects_empty_and_out_of_range() {
        let store = MemoryStore::new();
        let err = update(&store, UpdateUserSettings::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let changes = UpdateUserSettings { alert_threshold: Some(-1.0), calculator_tolerance: None };
        assert!(matches!(update(&store, changes).await, Err(AppError::Validation(_))));
        assert!(store.get_user_settings(DEFAULT_USER_ID).await.unwrap().is_none());
    }
}
