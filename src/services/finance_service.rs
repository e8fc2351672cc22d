use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{Days, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::external::price_provider::{PriceProvider, PriceProviderError, Quote};
use crate::models::{
    Asset, BenchmarkPoint, BenchmarkResponse, EnrichedAsset, TickerHistoryPoint,
    TickerHistoryResponse, TickerValidation,
};
use crate::services::fx_cache::{pair_key, ExchangeRateCache};
use crate::services::numeric::{percentage_of, round2, to_decimal};

/// Market data access with graceful degradation. Quote failures become
/// invalid quotes and rate failures fall back to the cache, then to the
/// configured defaults.
#[derive(Clone)]
pub struct FinanceService {
    provider: Arc<dyn PriceProvider>,
    fx_cache: ExchangeRateCache,
    default_fx_rates: Arc<HashMap<String, BigDecimal>>,
    quote_concurrency: usize,
}

impl FinanceService {
    pub fn new(provider: Arc<dyn PriceProvider>, fx_cache: ExchangeRateCache, settings: &Settings) -> Self {
        Self {
            provider,
            fx_cache,
            default_fx_rates: Arc::new(settings.default_fx_rates.clone()),
            quote_concurrency: settings.quote_concurrency.max(1),
        }
    }

    pub fn fx_cache(&self) -> &ExchangeRateCache {
        &self.fx_cache
    }

    pub async fn get_quote(&self, symbol: &str) -> Quote {
        match self.provider.fetch_quote(symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Quote unavailable for {}: {}", symbol, e);
                Quote::unavailable(symbol)
            }
        }
    }

    /// Fetches each distinct symbol once, at most `quote_concurrency` at a
    /// time, and returns only after every fetch has finished.
    pub async fn get_quotes<I, S>(&self, symbols: I) -> HashMap<String, Quote>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<String> = symbols
            .into_iter()
            .map(|s| {
                let s: String = s.into();
                s.trim().to_string()
            })
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();

        debug!("Fetching {} quotes", unique.len());

        stream::iter(unique)
            .map(|symbol| async move {
                let quote = self.get_quote(&symbol).await;
                (symbol, quote)
            })
            .buffer_unordered(self.quote_concurrency)
            .collect()
            .await
    }

    /// Rate to convert one unit of `from` into `to`.
    ///
    /// Live `{FROM}{TO}=X` quote first, then the last good rate, then the
    /// configured default. `None` when all three are missing.
    pub async fn exchange_rate(&self, from: &str, to: &str) -> Option<BigDecimal> {
        if from.trim().eq_ignore_ascii_case(to.trim()) {
            return Some(BigDecimal::from(1));
        }

        let key = pair_key(from, to);
        let quote = self.get_quote(&format!("{}=X", key)).await;
        if let Some(rate) = quote.usable_price().and_then(to_decimal) {
            self.fx_cache.record(from, to, rate.clone());
            return Some(rate);
        }

        if let Some(cached) = self.fx_cache.get(from, to) {
            warn!("Rate fetch failed for {}, using cached {} from {}", key, cached.rate, cached.fetched_at);
            return Some(cached.rate);
        }

        match self.default_fx_rates.get(&key) {
            Some(rate) => {
                warn!("Rate fetch failed for {}, using default {}", key, rate);
                Some(rate.clone())
            }
            None => {
                warn!("No rate available for {}", key);
                None
            }
        }
    }

    /// Rates into `to` for each distinct currency; currencies without any
    /// rate are left out.
    pub async fn exchange_rates<'a, I>(&self, currencies: I, to: &str) -> HashMap<String, BigDecimal>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: HashSet<String> = currencies
            .into_iter()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();

        let lookups = distinct.into_iter().map(|currency| async move {
            let rate = self.exchange_rate(&currency, to).await;
            rate.map(|r| (currency, r))
        });

        futures::future::join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    pub async fn validate_ticker(&self, ticker: &str) -> TickerValidation {
        let ticker = ticker.trim().to_string();
        match self.provider.fetch_quote(&ticker).await {
            Ok(quote) if quote.usable_price().is_some() => TickerValidation {
                valid: true,
                current_price: quote.usable_price().and_then(to_decimal),
                name: quote.name,
                currency: quote.currency,
                exchange: quote.exchange,
                ticker,
                error: None,
            },
            Ok(_) => invalid_ticker(ticker, "No price data for ticker".to_string()),
            Err(PriceProviderError::NotFound(_)) => invalid_ticker(ticker, "Ticker not found".to_string()),
            Err(e) => invalid_ticker(ticker, e.to_string()),
        }
    }

    /// Prices every asset in one pass and computes value and profit in
    /// `reporting_currency`.
    pub async fn enrich_assets(&self, assets: Vec<Asset>, reporting_currency: &str) -> Vec<EnrichedAsset> {
        let quotes = self.get_quotes(assets.iter().filter_map(|a| a.ticker().map(String::from))).await;
        let rates = self
            .exchange_rates(assets.iter().map(|a| a.currency.as_str()), reporting_currency)
            .await;

        assets
            .into_iter()
            .map(|asset| {
                let quote = asset.ticker().and_then(|t| quotes.get(t));
                let rate = rates.get(&asset.currency.trim().to_uppercase());
                enrich_asset(asset, quote, rate, reporting_currency)
            })
            .collect()
    }

    pub async fn benchmark_history(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> BenchmarkResponse {
        let points = match self.provider.fetch_daily_history(ticker, start, end).await {
            Ok(points) => points,
            Err(e) => {
                warn!("Benchmark history unavailable for {}: {}", ticker, e);
                Vec::new()
            }
        };

        let first = points.first().map(|p| p.close).filter(|c| *c != 0.0);
        let data = points
            .iter()
            .map(|p| BenchmarkPoint {
                date: p.date,
                close: round2(p.close),
                return_rate: first.map(|f| round2((p.close - f) / f * 100.0)).unwrap_or(0.0),
            })
            .collect();

        BenchmarkResponse {
            ticker: ticker.to_string(),
            name: benchmark_name(ticker).to_string(),
            data,
        }
    }

    pub async fn ticker_history(&self, ticker: &str, days: u32) -> TickerHistoryResponse {
        let end = Utc::now().date_naive();
        let start = end.checked_sub_days(Days::new(days as u64)).unwrap_or(end);

        let points = match self.provider.fetch_daily_history(ticker, start, end).await {
            Ok(points) => points,
            Err(e) => {
                warn!("Ticker history unavailable for {}: {}", ticker, e);
                Vec::new()
            }
        };

        let change_rate = match (points.first(), points.last()) {
            (Some(first), Some(last)) if first.close != 0.0 => {
                round2((last.close - first.close) / first.close * 100.0)
            }
            _ => 0.0,
        };

        TickerHistoryResponse {
            ticker: ticker.to_string(),
            data: points
                .iter()
                .map(|p| TickerHistoryPoint { date: p.date, close: round2(p.close) })
                .collect(),
            change_rate,
        }
    }
}

fn invalid_ticker(ticker: String, error: String) -> TickerValidation {
    TickerValidation {
        valid: false,
        ticker,
        name: None,
        current_price: None,
        currency: None,
        exchange: None,
        error: Some(error),
    }
}

pub fn benchmark_name(ticker: &str) -> &str {
    match ticker {
        "^KS11" => "KOSPI",
        "^GSPC" => "S&P 500",
        "^IXIC" => "NASDAQ",
        "^DJI" => "Dow Jones",
        other => other,
    }
}

/// Value and profit for one asset.
///
/// `rate` converts the asset currency into the reporting currency. A foreign
/// asset without a rate is left unpriced.
pub fn enrich_asset(
    asset: Asset,
    quote: Option<&Quote>,
    rate: Option<&BigDecimal>,
    reporting_currency: &str,
) -> EnrichedAsset {
    let zero = BigDecimal::zero();
    let foreign = !asset.currency.trim().eq_ignore_ascii_case(reporting_currency);
    let rate = if foreign { rate.cloned() } else { Some(BigDecimal::from(1)) };
    let manual_value = asset.is_manual_value();

    let principal = match (&rate, foreign) {
        (Some(rate), true) => {
            let purchase_rate = asset.purchase_exchange_rate.clone().unwrap_or_else(|| rate.clone());
            Some(&asset.average_price * &asset.quantity * purchase_rate)
        }
        (None, true) => None,
        (_, false) => Some(&asset.average_price * &asset.quantity),
    };

    let price = quote.and_then(Quote::usable_price).and_then(to_decimal);

    let (current_price, market_value, profit_loss, basis) = match (&price, &rate, &asset.current_value) {
        (Some(price), Some(rate), _) if asset.quantity > zero => {
            let market_value = price * &asset.quantity * rate;
            let basis = principal.clone().unwrap_or_else(BigDecimal::zero);
            let profit = &market_value - &basis;
            (Some(price.clone()), market_value, profit, basis)
        }
        (_, _, Some(current_value)) => {
            if manual_value {
                (None, current_value.clone(), BigDecimal::zero(), BigDecimal::zero())
            } else {
                let basis = &asset.average_price * &asset.quantity;
                (None, current_value.clone(), current_value - &basis, basis)
            }
        }
        _ => (price.clone(), BigDecimal::zero(), BigDecimal::zero(), BigDecimal::zero()),
    };

    let profit_rate = round2(percentage_of(&profit_loss, &basis));

    EnrichedAsset {
        current_price,
        market_value,
        profit_loss,
        profit_rate,
        cost_basis: principal,
        current_exchange_rate: if foreign { rate } else { None },
        manual_value,
        asset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{asset, quote, StubProvider};
    use std::str::FromStr;

    fn service(provider: StubProvider) -> FinanceService {
        FinanceService::new(Arc::new(provider), ExchangeRateCache::new(), &Settings::for_tests())
    }

    #[tokio::test]
    async fn test_exchange_rate_same_currency_is_one() {
        let finance = service(StubProvider::new());
        assert_eq!(finance.exchange_rate("KRW", "krw").await, Some(BigDecimal::from(1)));
    }

    #[tokio::test]
    async fn test_exchange_rate_prefers_live_and_caches_it() {
        let provider = StubProvider::new().with_quote("USDKRW=X", 1400.0);
        let finance = service(provider.clone());

        assert_eq!(finance.exchange_rate("USD", "KRW").await, Some(BigDecimal::from(1400)));
        assert_eq!(finance.fx_cache().get("USD", "KRW").unwrap().rate, BigDecimal::from(1400));

        // Provider goes down: last good rate wins over the configured default.
        provider.clear();
        assert_eq!(finance.exchange_rate("USD", "KRW").await, Some(BigDecimal::from(1400)));
    }

    #[tokio::test]
    async fn test_exchange_rate_falls_back_to_default() {
        let finance = service(StubProvider::new());
        assert_eq!(finance.exchange_rate("USD", "KRW").await, Some(BigDecimal::from(1350)));
        assert_eq!(finance.exchange_rate("EUR", "KRW").await, None);
    }

    #[tokio::test]
    async fn test_get_quotes_dedupes_and_degrades() {
        let provider = StubProvider::new().with_quote("AAPL", 200.0);
        let finance = service(provider.clone());

        let quotes = finance.get_quotes(vec!["AAPL", "AAPL", "NOPE", " "]).await;
        assert_eq!(quotes.len(), 2);
        assert!(quotes["AAPL"].valid);
        assert!(!quotes["NOPE"].valid);
        assert_eq!(provider.calls("AAPL"), 1);
    }

    #[tokio::test]
    async fn test_validate_ticker() {
        let finance = service(StubProvider::new().with_quote("AAPL", 200.0));
        assert!(finance.validate_ticker("AAPL").await.valid);

        let invalid = finance.validate_ticker("NOPE").await;
        assert!(!invalid.valid);
        assert!(invalid.error.is_some());
    }

    #[test]
    fn test_enrich_foreign_asset_uses_purchase_rate_for_principal() {
        let mut a = asset("Apple Inc.", Some("AAPL"), 10, 150);
        a.currency = "USD".into();
        a.purchase_exchange_rate = Some(BigDecimal::from(1300));

        let q = quote("AAPL", 200.0);
        let enriched = enrich_asset(a, Some(&q), Some(&BigDecimal::from(1400)), "KRW");

        assert_eq!(enriched.market_value, BigDecimal::from(2_800_000));
        assert_eq!(enriched.cost_basis, Some(BigDecimal::from(1_950_000)));
        assert_eq!(enriched.profit_loss, BigDecimal::from(850_000));
        assert_eq!(enriched.current_price, Some(BigDecimal::from(200)));
        assert!((enriched.profit_rate - 43.59).abs() < 1e-9);
    }

    #[test]
    fn test_enrich_manual_value_asset_has_no_profit() {
        let mut cash = asset("CMA", None, 0, 0);
        cash.current_value = Some(BigDecimal::from(5_000_000));

        let enriched = enrich_asset(cash, None, None, "KRW");
        assert!(enriched.manual_value);
        assert_eq!(enriched.market_value, BigDecimal::from(5_000_000));
        assert_eq!(enriched.profit_loss, BigDecimal::zero());
        assert_eq!(enriched.profit_rate, 0.0);
    }

    #[test]
    fn test_enrich_entered_value_with_cost_basis() {
        let mut gold = asset("국내 금현물", None, 10, 90_000);
        gold.current_value = Some(BigDecimal::from(1_000_000));

        let enriched = enrich_asset(gold, None, None, "KRW");
        assert!(!enriched.manual_value);
        assert_eq!(enriched.profit_loss, BigDecimal::from(100_000));
        assert_eq!(enriched.profit_rate, 11.11);
    }

    #[test]
    fn test_enrich_unpriced_ticker_is_zero() {
        let a = asset("Delisted", Some("GONE"), 10, 1000);
        let q = Quote::unavailable("GONE");
        let enriched = enrich_asset(a, Some(&q), None, "KRW");
        assert_eq!(enriched.market_value, BigDecimal::zero());
        assert_eq!(enriched.profit_loss, BigDecimal::zero());
        assert_eq!(enriched.cost_basis, Some(BigDecimal::from_str("10000").unwrap()));
    }

    #[tokio::test]
    async fn test_ticker_history_change_rate() {
        let today = Utc::now().date_naive();
        let provider = StubProvider::new().with_history(
            "^KS11",
            vec![(today - Days::new(2), 2500.0), (today - Days::new(1), 2550.0), (today, 2600.0)],
        );
        let finance = service(provider);

        let history = finance.ticker_history("^KS11", 7).await;
        assert_eq!(history.data.len(), 3);
        assert_eq!(history.change_rate, 4.0);

        let benchmark = finance.benchmark_history("^KS11", today - Days::new(7), today).await;
        assert_eq!(benchmark.name, "KOSPI");
        assert_eq!(benchmark.data[0].return_rate, 0.0);
        assert_eq!(benchmark.data[2].return_rate, 4.0);
    }
}
