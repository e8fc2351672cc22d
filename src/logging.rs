//! Tracing setup: an `EnvFilter` and console output, plus an optional Loki
//! shipper when built with the `loki` feature.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use crate::config::ConfigError;

const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Where events go besides the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Console,
    Loki(Url),
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub sink: LogSink,
    pub service_name: String,
    pub environment: String,
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. `LOKI_URL` is required and
    /// must parse once `LOKI_ENABLED` is true.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loki_enabled = match var("LOKI_ENABLED") {
            Some(raw) => raw
                .trim()
                .parse::<bool>()
                .map_err(|_| ConfigError::Invalid { key: "LOKI_ENABLED", value: raw })?,
            None => false,
        };

        let sink = if loki_enabled {
            let raw = var("LOKI_URL").ok_or(ConfigError::Missing("LOKI_URL"))?;
            let url = Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid { key: "LOKI_URL", value: raw })?;
            LogSink::Loki(url)
        } else {
            LogSink::Console
        };

        Ok(Self {
            filter: var("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            sink,
            service_name: var("SERVICE_NAME").unwrap_or_else(|| "meowney".to_string()),
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        })
    }
}

/// Installs the global subscriber. Fails if one is already set.
pub fn init_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid log filter '{}'", config.filter))?;
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    #[cfg(feature = "loki")]
    let registry = registry.with(loki_layer(&config)?);

    registry.try_init().context("global subscriber already set")?;

    match &config.sink {
        LogSink::Loki(url) if cfg!(feature = "loki") => {
            info!("📊 Logging to console and Loki at {} ({})", url, config.environment)
        }
        LogSink::Loki(_) => warn!("Loki requested but this build lacks the `loki` feature, console only"),
        LogSink::Console => info!("📊 Console logging initialized ({})", config.environment),
    }
    Ok(())
}

#[cfg(feature = "loki")]
fn loki_layer(config: &LoggingConfig) -> anyhow::Result<Option<tracing_loki::Layer>> {
    let LogSink::Loki(url) = &config.sink else {
        return Ok(None);
    };

    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url.clone())?;
    // Ships buffered events for the lifetime of the process
    tokio::spawn(task);
    Ok(Some(layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<LoggingConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoggingConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_console() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.sink, LogSink::Console);
        assert_eq!(config.filter, DEFAULT_FILTER);
        assert_eq!(config.service_name, "meowney");
    }

    #[test]
    fn test_loki_requires_url() {
        let err = config_from(&[("LOKI_ENABLED", "true")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("LOKI_URL")));

        let err = config_from(&[("LOKI_ENABLED", "true"), ("LOKI_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LOKI_URL", .. }));

        let config = config_from(&[("LOKI_ENABLED", "true"), ("LOKI_URL", "http://localhost:3100")]).unwrap();
        assert!(matches!(config.sink, LogSink::Loki(ref url) if url.port() == Some(3100)));
    }

    #[test]
    fn test_loki_url_ignored_when_disabled() {
        let config = config_from(&[("LOKI_ENABLED", "false"), ("LOKI_URL", "http://localhost:3100")]).unwrap();
        assert_eq!(config.sink, LogSink::Console);
        assert!(config_from(&[("LOKI_ENABLED", "maybe")]).is_err());
    }
}
