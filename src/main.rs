use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;

use meowney_backend::app;
use meowney_backend::config::Settings;
use meowney_backend::external::price_provider::PriceProvider;
use meowney_backend::external::yahoo::YahooProvider;
use meowney_backend::logging::{init_logging, LoggingConfig};
use meowney_backend::services::finance_service::FinanceService;
use meowney_backend::services::fx_cache::ExchangeRateCache;
use meowney_backend::services::job_scheduler_service::{JobContext, JobSchedulerService};
use meowney_backend::state::AppState;
use meowney_backend::store::{PgStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging first
    let logging = LoggingConfig::from_env().context("Invalid logging configuration")?;
    init_logging(logging).context("Failed to initialize logging")?;

    let settings = Arc::new(Settings::from_env()?);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await
        .context("Failed to connect to the database")?;

    if settings.run_migrations {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let yahoo = match &settings.yahoo_base_url {
        Some(url) => YahooProvider::new().with_base_url(url.as_str()),
        None => YahooProvider::new(),
    };
    let provider: Arc<dyn PriceProvider> = Arc::new(yahoo);
    info!("📊 Using price provider: Yahoo Finance chart API");

    let finance = FinanceService::new(provider, ExchangeRateCache::new(), &settings);
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    let mut scheduler = if settings.scheduler_enabled {
        let mut scheduler = JobSchedulerService::new(JobContext {
            store: store.clone(),
            finance: finance.clone(),
            settings: settings.clone(),
        })
        .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        info!("Job scheduler disabled");
        None
    };

    let state = AppState {
        store,
        finance,
        settings: settings.clone(),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    info!("🚀 {} backend running at http://{}/", settings.app_name, settings.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.stop().await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
