use std::sync::Arc;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Last rate successfully fetched for a currency pair.
#[derive(Debug, Clone)]
pub struct CachedRate {
    pub rate: BigDecimal,
    pub fetched_at: DateTime<Utc>,
}

/// Process-wide last-known-good exchange rates, keyed by pair (`USDKRW`).
///
/// Entries never expire. A successful fetch overwrites the entry and a failed
/// fetch reads it, so a stale rate is served until the provider recovers.
#[derive(Clone, Default)]
pub struct ExchangeRateCache {
    cache: Arc<DashMap<String, CachedRate>>,
}

pub fn pair_key(from: &str, to: &str) -> String {
    format!("{}{}", from.trim().to_uppercase(), to.trim().to_uppercase())
}

impl ExchangeRateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, from: &str, to: &str) -> Option<CachedRate> {
        self.cache.get(&pair_key(from, to)).map(|entry| entry.value().clone())
    }

    /// Record a successful fetch
    pub fn record(&self, from: &str, to: &str, rate: BigDecimal) {
        let entry = CachedRate { rate, fetched_at: Utc::now() };
        self.cache.insert(pair_key(from, to), entry);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_records_and_retrieves_rates() {
        let cache = ExchangeRateCache::new();
        assert!(cache.get("USD", "KRW").is_none());

        cache.record("usd", "krw", BigDecimal::from(1380));

        let cached = cache.get("USD", "KRW").unwrap();
        assert_eq!(cached.rate, BigDecimal::from(1380));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_newer_rate_overwrites() {
        let cache = ExchangeRateCache::new();
        cache.record("USD", "KRW", BigDecimal::from(1380));
        cache.record("USD", "KRW", BigDecimal::from(1402));

        assert_eq!(cache.get("USD", "KRW").unwrap().rate, BigDecimal::from(1402));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ExchangeRateCache::new();
        let other = cache.clone();
        other.record("JPY", "KRW", BigDecimal::from(9));

        assert!(cache.get("JPY", "KRW").is_some());
        assert!(cache.get("KRW", "JPY").is_none());
    }
}
