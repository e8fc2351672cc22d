#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use meowney_backend::app::create_app;
use meowney_backend::config::Settings;
use meowney_backend::external::price_provider::{
    ExternalPricePoint, PriceProvider, PriceProviderError, Quote,
};
use meowney_backend::services::finance_service::FinanceService;
use meowney_backend::services::fx_cache::ExchangeRateCache;
use meowney_backend::state::AppState;
use meowney_backend::store::MemoryStore;

/// Fixed quotes keyed by symbol; anything else is `NotFound`.
#[derive(Clone, Default)]
pub struct FixedPrices {
    quotes: Arc<Mutex<HashMap<String, f64>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl FixedPrices {
    pub fn with(self, symbol: &str, price: f64) -> Self {
        self.quotes.lock().insert(symbol.to_string(), price);
        self
    }

    pub fn calls(&self, symbol: &str) -> usize {
        self.calls.lock().get(symbol).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PriceProvider for FixedPrices {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, PriceProviderError> {
        *self.calls.lock().entry(symbol.to_string()).or_insert(0) += 1;
        let price = self
            .quotes
            .lock()
            .get(symbol)
            .copied()
            .ok_or_else(|| PriceProviderError::NotFound(symbol.to_string()))?;
        Ok(Quote {
            symbol: symbol.to_string(),
            price: Some(price),
            currency: None,
            name: Some(symbol.to_string()),
            exchange: None,
            valid: true,
        })
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        Err(PriceProviderError::NotFound(symbol.to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
}

pub fn test_app(prices: FixedPrices) -> TestApp {
    let settings = Arc::new(Settings::for_tests());
    let store = MemoryStore::new();
    let finance = FinanceService::new(Arc::new(prices), ExchangeRateCache::new(), &settings);
    let state = AppState {
        store: Arc::new(store.clone()),
        finance,
        settings,
    };
    TestApp { router: create_app(state), store }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }
}

pub fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap(),
        Value::String(s) => s.parse().unwrap(),
        other => panic!("not a number: {other}"),
    }
}
