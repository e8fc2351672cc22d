use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ExternalPricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Latest quote for one symbol. `valid` is false when the symbol resolved but
/// carried no usable price.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub valid: bool,
}

impl Quote {
    pub fn unavailable(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: None,
            currency: None,
            name: None,
            exchange: None,
            valid: false,
        }
    }

    /// The price when the quote is valid, finite and positive.
    pub fn usable_price(&self) -> Option<f64> {
        if !self.valid {
            return None;
        }
        self.price.filter(|p| p.is_finite() && *p > 0.0)
    }
}

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("symbol not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, PriceProviderError>;

    /// Daily closes between `start` and `end` inclusive, ascending by date.
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError>;
}
