use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub api_prefix: String,
    pub app_name: String,
    pub reporting_currency: String,
    /// Static fallback rates keyed by currency pair (`USDKRW`).
    pub default_fx_rates: HashMap<String, BigDecimal>,
    pub quote_concurrency: usize,
    pub snapshot_hour: u32,
    pub snapshot_minute: u32,
    pub timezone: Tz,
    pub scheduler_enabled: bool,
    pub run_migrations: bool,
    pub yahoo_base_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let mut default_fx_rates = HashMap::new();
        let usd_krw: BigDecimal = parse_var("DEFAULT_USD_KRW_RATE", BigDecimal::from(1350))?;
        default_fx_rates.insert("USDKRW".to_string(), usd_krw);
        if let Ok(raw) = std::env::var("DEFAULT_FX_RATES") {
            default_fx_rates.extend(parse_fx_rates(&raw)?);
        }

        let snapshot_hour: u32 = parse_var("SNAPSHOT_HOUR", 23)?;
        let snapshot_minute: u32 = parse_var("SNAPSHOT_MINUTE", 0)?;
        if snapshot_hour > 23 {
            return Err(ConfigError::Invalid { key: "SNAPSHOT_HOUR", value: snapshot_hour.to_string() });
        }
        if snapshot_minute > 59 {
            return Err(ConfigError::Invalid { key: "SNAPSHOT_MINUTE", value: snapshot_minute.to_string() });
        }

        let quote_concurrency: usize = parse_var("QUOTE_CONCURRENCY", 5)?;

        Ok(Self {
            database_url,
            bind_addr: parse_var("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            api_prefix: std::env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "Meowney".to_string()),
            reporting_currency: std::env::var("REPORTING_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|_| "KRW".to_string()),
            default_fx_rates,
            quote_concurrency: quote_concurrency.max(1),
            snapshot_hour,
            snapshot_minute,
            timezone: parse_var("TIMEZONE", chrono_tz::Asia::Seoul)?,
            scheduler_enabled: parse_var("SCHEDULER_ENABLED", true)?,
            run_migrations: parse_var("RUN_MIGRATIONS", false)?,
            yahoo_base_url: std::env::var("YAHOO_BASE_URL").ok(),
        })
    }

    /// Settings for tests and local tooling that never touch the environment.
    pub fn for_tests() -> Self {
        let mut default_fx_rates = HashMap::new();
        default_fx_rates.insert("USDKRW".to_string(), BigDecimal::from(1350));
        Self {
            database_url: String::new(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            api_prefix: "/api/v1".to_string(),
            app_name: "Meowney".to_string(),
            reporting_currency: "KRW".to_string(),
            default_fx_rates,
            quote_concurrency: 5,
            snapshot_hour: 23,
            snapshot_minute: 0,
            timezone: chrono_tz::Asia::Seoul,
            scheduler_enabled: false,
            run_migrations: false,
            yahoo_base_url: None,
        }
    }

    /// Cron expression (`sec min hour day month weekday`) for the daily snapshot.
    pub fn snapshot_cron(&self) -> String {
        format!("0 {} {} * * *", self.snapshot_minute, self.snapshot_hour)
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Parses `USDKRW=1350,JPYKRW=9.1`.
fn parse_fx_rates(raw: &str) -> Result<HashMap<String, BigDecimal>, ConfigError> {
    let mut rates = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = || ConfigError::Invalid { key: "DEFAULT_FX_RATES", value: entry.to_string() };
        let (pair, rate) = entry.split_once('=').ok_or_else(invalid)?;
        let pair = pair.trim().to_uppercase();
        if pair.len() != 6 {
            return Err(invalid());
        }
        let rate = BigDecimal::from_str(rate.trim()).map_err(|_| invalid())?;
        rates.insert(pair, rate);
    }
    Ok(rates)
}
