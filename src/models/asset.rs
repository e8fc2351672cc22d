use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::portfolio::default_currency;

// A held position. Priced through its ticker when it has one, otherwise valued
// from the user-entered current value (cash, physical gold, deposits).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub id: uuid::Uuid,
    pub portfolio_id: uuid::Uuid,
    pub name: String,
    pub ticker: Option<String>,
    pub asset_type: String,
    pub category_id: Option<uuid::Uuid>,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub quantity: BigDecimal,
    pub average_price: BigDecimal,
    pub currency: String,
    pub current_value: Option<BigDecimal>,
    pub purchase_exchange_rate: Option<BigDecimal>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Asset {
    pub(crate) fn new(portfolio_id: uuid::Uuid, input: CreateAsset) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            portfolio_id,
            name: input.name,
            ticker: non_empty(input.ticker),
            asset_type: input.asset_type,
            category_id: input.category_id,
            category_name: None,
            category_color: None,
            quantity: input.quantity,
            average_price: input.average_price,
            currency: input.currency,
            current_value: input.current_value,
            purchase_exchange_rate: input.purchase_exchange_rate,
            notes: input.notes,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The ticker when one is set and not blank.
    pub fn ticker(&self) -> Option<&str> {
        self.ticker.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Zero quantity and no ticker: valued purely from the entered current value.
    pub fn is_manual_value(&self) -> bool {
        self.ticker().is_none() && self.quantity == BigDecimal::from(0)
    }

    pub fn is_cash(&self) -> bool {
        self.asset_type.eq_ignore_ascii_case("cash")
    }

    pub(crate) fn apply(&mut self, changes: UpdateAsset) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(ticker) = changes.ticker {
            self.ticker = non_empty(Some(ticker));
        }
        if let Some(asset_type) = changes.asset_type {
            self.asset_type = asset_type;
        }
        if changes.category_id.is_some() {
            self.category_id = changes.category_id;
        }
        if let Some(quantity) = changes.quantity {
            self.quantity = quantity;
        }
        if let Some(average_price) = changes.average_price {
            self.average_price = average_price;
        }
        if let Some(currency) = changes.currency {
            self.currency = currency;
        }
        if changes.current_value.is_some() {
            self.current_value = changes.current_value;
        }
        if changes.purchase_exchange_rate.is_some() {
            self.purchase_exchange_rate = changes.purchase_exchange_rate;
        }
        if changes.notes.is_some() {
            self.notes = changes.notes;
        }
        if let Some(active) = changes.is_active {
            self.is_active = active;
        }
        self.updated_at = chrono::Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAsset {
    pub portfolio_id: Option<uuid::Uuid>,
    pub name: String,
    pub ticker: Option<String>,
    #[serde(default = "default_asset_type")]
    pub asset_type: String,
    pub category_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub quantity: BigDecimal,
    #[serde(default)]
    pub average_price: BigDecimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub current_value: Option<BigDecimal>,
    pub purchase_exchange_rate: Option<BigDecimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAsset {
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub asset_type: Option<String>,
    pub category_id: Option<uuid::Uuid>,
    pub quantity: Option<BigDecimal>,
    pub average_price: Option<BigDecimal>,
    pub currency: Option<String>,
    pub current_value: Option<BigDecimal>,
    pub purchase_exchange_rate: Option<BigDecimal>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

fn default_asset_type() -> String {
    "stock".to_string()
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len == 0 || len > 100 {
        return Err("Asset name must be 1-100 characters".into());
    }
    Ok(())
}

fn validate_non_negative(field: &str, value: &BigDecimal) -> Result<(), String> {
    if *value < BigDecimal::from(0) {
        return Err(format!("{} cannot be negative", field));
    }
    Ok(())
}

impl CreateAsset {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        if self.ticker.as_deref().map(str::len).unwrap_or(0) > 20 {
            return Err("Ticker must be at most 20 characters".into());
        }
        validate_non_negative("Quantity", &self.quantity)?;
        validate_non_negative("Average price", &self.average_price)?;
        if self.currency.trim().is_empty() || self.currency.len() > 10 {
            return Err("Currency must be 1-10 characters".into());
        }
        Ok(())
    }
}

impl UpdateAsset {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(quantity) = &self.quantity {
            validate_non_negative("Quantity", quantity)?;
        }
        if let Some(average_price) = &self.average_price {
            validate_non_negative("Average price", average_price)?;
        }
        Ok(())
    }
}

/// An asset with live pricing and profit figures, in the reporting currency.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedAsset {
    #[serde(flatten)]
    pub asset: Asset,
    pub current_price: Option<BigDecimal>,
    pub market_value: BigDecimal,
    pub profit_loss: BigDecimal,
    pub profit_rate: f64,
    pub cost_basis: Option<BigDecimal>,
    pub current_exchange_rate: Option<BigDecimal>,
    pub manual_value: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickerValidation {
    pub valid: bool,
    pub ticker: String,
    pub name: Option<String>,
    pub current_price: Option<BigDecimal>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str) -> CreateAsset {
        CreateAsset {
            portfolio_id: None,
            name: name.to_string(),
            ticker: None,
            asset_type: default_asset_type(),
            category_id: None,
            quantity: BigDecimal::from(0),
            average_price: BigDecimal::from(0),
            currency: default_currency(),
            current_value: None,
            purchase_exchange_rate: None,
            notes: None,
        }
    }

    #[test]
    fn test_validate_rejects_negative_quantity() {
        let mut input = create("Samsung");
        input.quantity = BigDecimal::from(-1);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert!(create("   ").validate().is_err());
        assert!(create("Cash").validate().is_ok());
    }

    #[test]
    fn test_blank_ticker_is_dropped() {
        let mut input = create("Cash");
        input.ticker = Some("  ".into());
        let asset = Asset::new(uuid::Uuid::new_v4(), input);
        assert!(asset.ticker.is_none());
        assert!(asset.is_manual_value());
    }
}
