use crate::external::price_provider::{ExternalPricePoint, PriceProvider, PriceProviderError, Quote};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; meowney/0.1)";

/// Yahoo Finance chart API. Serves both quotes and daily history, and covers
/// currency pairs through `{FROM}{TO}=X` symbols.
pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, base_url: DEFAULT_BASE_URL.to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, symbol: &str) -> Result<url::Url, PriceProviderError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| PriceProviderError::BadResponse(format!("invalid base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PriceProviderError::BadResponse("base url cannot hold a path".into()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        query: &[(&str, String)],
    ) -> Result<ChartResult, PriceProviderError> {
        let url = self.chart_url(symbol)?;

        let resp = self.client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(PriceProviderError::RateLimited),
            reqwest::StatusCode::NOT_FOUND => return Err(PriceProviderError::NotFound(symbol.to_string())),
            status if !status.is_success() => {
                return Err(PriceProviderError::BadResponse(format!("HTTP {} for {}", status, symbol)));
            }
            _ => {}
        }

        let body = resp
            .json::<ChartResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        if let Some(err) = body.chart.error {
            let description = err.description.unwrap_or_default();
            return match err.code.as_deref() {
                Some("Not Found") => Err(PriceProviderError::NotFound(symbol.to_string())),
                _ => Err(PriceProviderError::BadResponse(description)),
            };
        }

        body.chart.result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| PriceProviderError::BadResponse("missing result".into()))
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    currency: Option<String>,
    exchange_name: Option<String>,
    short_name: Option<String>,
    long_name: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResult {
    fn closes(&self) -> Vec<ExternalPricePoint> {
        let Some(closes) = self.indicators.quote.first().map(|q| &q.close) else {
            return Vec::new();
        };

        // timestamp aligns with close list by index
        let mut out: Vec<ExternalPricePoint> = self.timestamp
            .iter()
            .zip(closes.iter())
            .filter_map(|(ts, close)| {
                let close = (*close)?;
                let date = chrono::DateTime::from_timestamp(*ts, 0)?.date_naive();
                Some(ExternalPricePoint { date, close })
            })
            .collect();

        out.sort_by_key(|p| p.date);
        out
    }
}

fn unix_start_of(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[async_trait]
impl PriceProvider for YahooProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, PriceProviderError> {
        let query = [("interval", "1d".to_string()), ("range", "5d".to_string())];
        let result = self.fetch_chart(symbol, &query).await?;

        let last_close = result.closes().last().map(|p| p.close);
        let meta = result.meta;
        let price = meta.regular_market_price
            .or(meta.previous_close)
            .or(meta.chart_previous_close)
            .or(last_close);

        Ok(Quote {
            symbol: meta.symbol.unwrap_or_else(|| symbol.to_string()),
            price,
            currency: meta.currency,
            name: meta.long_name.or(meta.short_name),
            exchange: meta.exchange_name,
            valid: price.is_some(),
        })
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let period_end = end.checked_add_days(Days::new(1)).unwrap_or(end);
        let query = [
            ("interval", "1d".to_string()),
            ("period1", unix_start_of(start).to_string()),
            ("period2", unix_start_of(period_end).to_string()),
        ];
        let result = self.fetch_chart(symbol, &query).await?;

        Ok(result.closes()
            .into_iter()
            .filter(|p| p.date >= start && p.date <= end)
            .collect())
    }
}
