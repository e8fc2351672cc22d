use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{
    assets, dashboard, data_migration, health, jobs, portfolios, rebalance, settings,
};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let prefix = state.settings.api_prefix.trim_end_matches('/').to_string();

    let api = Router::<AppState>::new()
        .nest("/portfolios", portfolios::router())
        .nest("/assets", assets::router())
        .nest("/dashboard", dashboard::router())
        .nest("/rebalance", rebalance::router())
        .nest("/data", data_migration::router())
        .nest("/jobs", jobs::router())
        .nest("/settings", settings::router());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest(&prefix, api)
        .layer(cors)
        .with_state(state)
}
