pub mod api;
pub mod bootstrap;
pub mod catalog;
pub mod classifier;
pub mod health;

use axum::Router;
use offerwise_core::config::AppConfig;

pub fn init_logging(config: &AppConfig) {
    use offerwise_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

/// Recommendation API, catalog browsing and health probe served from one listener.
pub fn app_router(app: &bootstrap::Application) -> Router {
    Router::new()
        .merge(api::router(api::ApiState {
            engine: app.engine.clone(),
            history: app.history.clone(),
        }))
        .merge(catalog::router(catalog::CatalogState { catalog: app.catalog.clone() }))
        .merge(health::router(health::HealthState {
            db_pool: app.db_pool.clone(),
            engine: app.engine.clone(),
        }))
}
