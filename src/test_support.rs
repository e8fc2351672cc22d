//! Fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::external::price_provider::{ExternalPricePoint, PriceProvider, PriceProviderError, Quote};
use crate::models::{AllocationGroup, AllocationGroupItem, Asset, PlanAllocation};

pub fn asset(name: &str, ticker: Option<&str>, quantity: i64, average_price: i64) -> Asset {
    let now = Utc::now();
    Asset {
        id: Uuid::new_v4(),
        portfolio_id: Uuid::nil(),
        name: name.to_string(),
        ticker: ticker.map(String::from),
        asset_type: "stock".to_string(),
        category_id: None,
        category_name: None,
        category_color: None,
        quantity: BigDecimal::from(quantity),
        average_price: BigDecimal::from(average_price),
        currency: "KRW".to_string(),
        current_value: None,
        purchase_exchange_rate: None,
        notes: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn quote(symbol: &str, price: f64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        price: Some(price),
        currency: None,
        name: Some(symbol.to_string()),
        exchange: None,
        valid: true,
    }
}

pub fn allocation(ticker: Option<&str>, alias: Option<&str>, target_percentage: i64) -> PlanAllocation {
    PlanAllocation {
        id: Uuid::new_v4(),
        plan_id: Uuid::nil(),
        asset_id: None,
        ticker: ticker.map(String::from),
        alias: alias.map(String::from),
        display_name: None,
        target_percentage: BigDecimal::from(target_percentage),
        created_at: Utc::now(),
    }
}

pub fn group(name: &str, target_percentage: i64) -> AllocationGroup {
    AllocationGroup {
        id: Uuid::new_v4(),
        plan_id: Uuid::nil(),
        name: name.to_string(),
        target_percentage: BigDecimal::from(target_percentage),
        display_order: 0,
        created_at: Utc::now(),
    }
}

pub fn group_item(group_id: Uuid, asset_ref: Option<Uuid>, ticker: Option<&str>, alias: Option<&str>) -> AllocationGroupItem {
    AllocationGroupItem {
        id: Uuid::new_v4(),
        group_id,
        asset_id: asset_ref,
        ticker: ticker.map(String::from),
        alias: alias.map(String::from),
    }
}

#[derive(Default)]
struct StubState {
    quotes: HashMap<String, f64>,
    history: HashMap<String, Vec<ExternalPricePoint>>,
    calls: HashMap<String, usize>,
}

/// In-process price provider. Clones share state, so a test can change
/// prices after handing the stub to a service. Unknown symbols are `NotFound`.
#[derive(Clone, Default)]
pub struct StubProvider {
    state: Arc<Mutex<StubState>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(self, symbol: &str, price: f64) -> Self {
        self.state.lock().quotes.insert(symbol.to_string(), price);
        self
    }

    pub fn with_history(self, symbol: &str, closes: Vec<(NaiveDate, f64)>) -> Self {
        let points = closes
            .into_iter()
            .map(|(date, close)| ExternalPricePoint { date, close })
            .collect();
        self.state.lock().history.insert(symbol.to_string(), points);
        self
    }

    /// Forget every quote and history, as if the upstream went away.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.quotes.clear();
        state.history.clear();
    }

    pub fn calls(&self, symbol: &str) -> usize {
        self.state.lock().calls.get(symbol).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PriceProvider for StubProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, PriceProviderError> {
        let mut state = self.state.lock();
        *state.calls.entry(symbol.to_string()).or_insert(0) += 1;
        match state.quotes.get(symbol) {
            Some(price) => Ok(quote(symbol, *price)),
            None => Err(PriceProviderError::NotFound(symbol.to_string())),
        }
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let state = self.state.lock();
        let points = state
            .history
            .get(symbol)
            .ok_or_else(|| PriceProviderError::NotFound(symbol.to_string()))?;
        Ok(points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .cloned()
            .collect())
    }
}
