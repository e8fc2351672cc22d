use uuid::Uuid;
use tracing::info;
use crate::errors::AppError;
use crate::models::{NewPortfolio, Portfolio, UpdatePortfolio};
use crate::store::Store;

pub const DEFAULT_PORTFOLIO_NAME: &str = "기본 포트폴리오";

pub async fn fetch_all(store: &dyn Store) -> Result<Vec<Portfolio>, AppError> {
    store.list_portfolios().await
}

pub async fn fetch_one(store: &dyn Store, id: Uuid) -> Result<Portfolio, AppError> {
    store
        .get_portfolio(id)
        .await?
        .ok_or(AppError::portfolio_not_found())
}

pub async fn update(store: &dyn Store, id: Uuid, input: UpdatePortfolio) -> Result<Portfolio, AppError> {
    input.validate()?;
    let input = UpdatePortfolio {
        name: input.name.map(|n| n.trim().to_string()),
        base_currency: input.base_currency.map(|c| c.trim().to_uppercase()),
        ..input
    };
    store
        .update_portfolio(id, input)
        .await?
        .ok_or(AppError::portfolio_not_found())
}

/// The first portfolio by creation time, if any exists.
pub async fn default_portfolio(store: &dyn Store) -> Result<Option<Portfolio>, AppError> {
    Ok(store.list_portfolios().await?.into_iter().next())
}

/// An explicit id must exist; without one the default portfolio is used.
pub async fn resolve(store: &dyn Store, portfolio_id: Option<Uuid>) -> Result<Option<Portfolio>, AppError> {
    match portfolio_id {
        Some(id) => fetch_one(store, id).await.map(Some),
        None => default_portfolio(store).await,
    }
}

/// Like [`resolve`], but creates the default portfolio on first use.
pub async fn resolve_or_create(
    store: &dyn Store,
    portfolio_id: Option<Uuid>,
    currency: &str,
) -> Result<Portfolio, AppError> {
    if let Some(portfolio) = resolve(store, portfolio_id).await? {
        return Ok(portfolio);
    }

    info!("No portfolio yet, creating '{}'", DEFAULT_PORTFOLIO_NAME);
    store
        .insert_portfolio(Portfolio::new(NewPortfolio {
            name: DEFAULT_PORTFOLIO_NAME.to_string(),
            description: None,
            base_currency: currency.to_string(),
            target_value: None,
        }))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_resolve_falls_back_to_first_portfolio() {
        let store = MemoryStore::new();
        assert!(resolve(&store, None).await.unwrap().is_none());

        let created = resolve_or_create(&store, None, "KRW").await.unwrap();
        assert_eq!(created.name, DEFAULT_PORTFOLIO_NAME);

        let again = resolve_or_create(&store, None, "KRW").await.unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(fetch_all(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_portfolio_is_not_found() {
        let store = MemoryStore::new();
        let err = resolve(&store, Some(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_blank_name() {
        let store = MemoryStore::new();
        let p = resolve_or_create(&store, None, "KRW").await.unwrap();
        let err = update(&store, p.id, UpdatePortfolio { name: Some(" ".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated = update(
            &store,
            p.id,
            UpdatePortfolio { base_currency: Some("usd".into()), ..Default::default() },
        )
        .await
        .unwrap();
        assert_eq!(updated.base_currency, "USD");
        assert_eq!(updated.name, DEFAULT_PORTFOLIO_NAME);
    }
}
