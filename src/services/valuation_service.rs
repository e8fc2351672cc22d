use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use tracing::debug;
use uuid::Uuid;

use crate::external::price_provider::Quote;
use crate::models::Asset;
use crate::services::finance_service::FinanceService;
use crate::services::numeric::to_decimal;

/// Value of one asset in the reporting currency. `current_price` stays in the
/// asset's own currency and is `None` when the asset has no usable quote.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationEntry {
    pub asset_id: Uuid,
    pub market_value: BigDecimal,
    pub current_price: Option<BigDecimal>,
}

/// Immutable valuation of a set of assets, taken once per calculation.
#[derive(Debug, Clone)]
pub struct ValuationSnapshot {
    pub reporting_currency: String,
    pub total_value: BigDecimal,
    entries: HashMap<Uuid, ValuationEntry>,
    exchange_rates: HashMap<String, BigDecimal>,
}

impl ValuationSnapshot {
    pub fn empty(reporting_currency: &str) -> Self {
        Self {
            reporting_currency: reporting_currency.to_uppercase(),
            total_value: BigDecimal::zero(),
            entries: HashMap::new(),
            exchange_rates: HashMap::new(),
        }
    }

    pub fn entry(&self, asset_id: &Uuid) -> Option<&ValuationEntry> {
        self.entries.get(asset_id)
    }

    pub fn market_value(&self, asset_id: &Uuid) -> BigDecimal {
        self.entry(asset_id)
            .map(|e| e.market_value.clone())
            .unwrap_or_else(BigDecimal::zero)
    }

    /// Rate from `currency` into the reporting currency, as used for this snapshot.
    pub fn rate_for(&self, currency: &str) -> Option<BigDecimal> {
        let currency = currency.trim().to_uppercase();
        if currency == self.reporting_currency {
            return Some(BigDecimal::from(1));
        }
        self.exchange_rates.get(&currency).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Prices every asset with one quote per distinct ticker, then builds the snapshot.
pub async fn value_assets(finance: &FinanceService, assets: &[Asset], reporting_currency: &str) -> ValuationSnapshot {
    let quotes = finance
        .get_quotes(assets.iter().filter_map(|a| a.ticker().map(String::from)))
        .await;

    let foreign = assets
        .iter()
        .filter(|a| a.ticker().is_some())
        .map(|a| a.currency.as_str())
        .filter(|c| !c.trim().eq_ignore_ascii_case(reporting_currency));
    let rates = finance.exchange_rates(foreign, reporting_currency).await;

    let snapshot = build_snapshot(assets, &quotes, &rates, reporting_currency);
    debug!(
        "Valued {} assets at {} {}",
        snapshot.len(),
        snapshot.total_value,
        snapshot.reporting_currency
    );
    snapshot
}

/// Ticker assets are worth `price * quantity`, converted when their currency
/// differs from the reporting one; without a usable quote or rate they are
/// worth zero. Assets without a ticker are worth their entered value as-is.
pub fn build_snapshot(
    assets: &[Asset],
    quotes: &HashMap<String, Quote>,
    rates: &HashMap<String, BigDecimal>,
    reporting_currency: &str,
) -> ValuationSnapshot {
    let mut snapshot = ValuationSnapshot::empty(reporting_currency);
    snapshot.exchange_rates = rates
        .iter()
        .map(|(currency, rate)| (currency.to_uppercase(), rate.clone()))
        .collect();

    for asset in assets {
        let (market_value, current_price) = match asset.ticker() {
            Some(ticker) => {
                let price = quotes
                    .get(ticker)
                    .and_then(Quote::usable_price)
                    .and_then(to_decimal);
                match (price, snapshot.rate_for(&asset.currency)) {
                    (Some(price), Some(rate)) => (&price * &asset.quantity * rate, Some(price)),
                    _ => (BigDecimal::zero(), None),
                }
            }
            None => (asset.current_value.clone().unwrap_or_else(BigDecimal::zero), None),
        };

        snapshot.total_value += &market_value;
        snapshot.entries.insert(
            asset.id,
            ValuationEntry { asset_id: asset.id, market_value, current_price },
        );
    }

    snapshot
}
