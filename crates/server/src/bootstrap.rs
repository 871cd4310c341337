use std::sync::Arc;

use estimator_core::config::{AppConfig, ConfigError, LoadOptions};
use estimator_core::engine::catalog::{Catalog, CatalogError};
use estimator_core::engine::pricing::DeterministicPricingEngine;
use estimator_core::engine::Estimator;
use estimator_db::{connect_with_config, migrations, DbPool, SqlEstimateRecordRepository};
use thiserror::Error;
use tracing::info;

use crate::api::ApiState;
use crate::audit::TracingAuditSink;
use crate::document::{DocumentError, DocumentRenderer};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub catalog: Arc<Catalog>,
    pub api_state: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog could not be loaded: {0}")]
    Catalog(#[from] CatalogError),
    #[error("document templates could not be loaded: {0}")]
    Document(#[from] DocumentError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
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

    let catalog = Arc::new(Catalog::from_config(&config.catalog)?);
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        services = catalog.len(),
        source = %config
            .catalog
            .path
            .as_ref()
            .map_or_else(|| "builtin".to_string(), |path| path.display().to_string()),
        units_policy = ?config.catalog.units_policy,
        "service catalog loaded"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
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

    let documents = DocumentRenderer::new(&config.document)?;
    let estimator = Estimator::new(
        catalog.clone(),
        DeterministicPricingEngine::new(config.catalog.units_policy),
    );
    let api_state = ApiState {
        estimator: Arc::new(estimator),
        records: Arc::new(SqlEstimateRecordRepository::new(db_pool.clone())),
        documents: Arc::new(documents),
        audit: Arc::new(TracingAuditSink),
    };

    Ok(Application { config, db_pool, catalog, api_state })
}
