use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// A named container of holdings with its own reporting currency and goal value.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Portfolio {
    pub id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_currency: String,
    pub target_value: Option<BigDecimal>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPortfolio {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_currency")]
    pub base_currency: String,
    pub target_value: Option<BigDecimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePortfolio {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_currency: Option<String>,
    pub target_value: Option<BigDecimal>,
}

pub(crate) fn default_currency() -> String {
    "KRW".to_string()
}

impl Portfolio {
    pub(crate) fn new(input: NewPortfolio) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: input.name,
            description: input.description,
            base_currency: input.base_currency,
            target_value: input.target_value,
            created_at: chrono::Utc::now(),
        }
    }
}

impl UpdatePortfolio {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Portfolio name cannot be empty".into());
            }
        }
        if let Some(currency) = &self.base_currency {
            if currency.trim().is_empty() || currency.len() > 10 {
                return Err("Base currency must be 1-10 characters".into());
            }
        }
        if let Some(target) = &self.target_value {
            if *target < BigDecimal::from(0) {
                return Err("Target value cannot be negative".into());
            }
        }
        Ok(())
    }
}
