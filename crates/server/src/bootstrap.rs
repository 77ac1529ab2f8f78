use std::sync::Arc;
use std::time::Duration;

use offerwise_core::config::{AppConfig, ConfigError, LoadOptions};
use offerwise_core::resolution::{ClassifierClient, DisabledClassifier, RecommendationEngine};
use offerwise_db::repositories::{
    CatalogRepository, HistoryRepository, SqlCatalogRepository, SqlRecommendationHistoryRepository,
};
use offerwise_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::classifier::HttpClassifierClient;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<RecommendationEngine>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub history: Arc<dyn HistoryRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("classifier client could not be built: {0}")]
    Classifier(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let classifier: Arc<dyn ClassifierClient> = if config.classifier.enabled {
        Arc::new(HttpClassifierClient::new(&config.classifier).map_err(BootstrapError::Classifier)?)
    } else {
        Arc::new(DisabledClassifier)
    };
    info!(
        event_name = "system.bootstrap.classifier_configured",
        correlation_id = "bootstrap",
        classifier_enabled = config.classifier.enabled,
        endpoint_url = %config.classifier.endpoint_url,
        "classifier client configured"
    );

    let catalog = Arc::new(SqlCatalogRepository::new(db_pool.clone()));
    let history = Arc::new(SqlRecommendationHistoryRepository::new(db_pool.clone()));
    let engine = RecommendationEngine::new(
        catalog.clone(),
        history.clone(),
        classifier,
        config.policy.clone(),
        Duration::from_millis(config.classifier.timeout_ms),
    );

    Ok(Application { config, db_pool, engine: Arc::new(engine), catalog, history })
}
