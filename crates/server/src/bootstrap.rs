use std::sync::Arc;

use gendra_core::config::{AppConfig, ConfigError, LoadOptions};
use gendra_core::orchestrator::QuoteOrchestrator;
use gendra_db::repositories::{SqlClientConfigRepository, SqlLeadRepository, SqlQuoteLog};
use gendra_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::service::QuoteService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<QuoteService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
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

    let orchestrator = Arc::new(QuoteOrchestrator::from_config(&config.pricing));
    let service = QuoteService::new(
        orchestrator,
        Arc::new(SqlClientConfigRepository::new(db_pool.clone())),
        config.cache.client_config_capacity,
        Arc::new(SqlQuoteLog::new(db_pool.clone())),
        Arc::new(SqlLeadRepository::new(db_pool.clone())),
    );
    info!(
        event_name = "system.bootstrap.service_ready",
        correlation_id = "bootstrap",
        registered_schemas = service.orchestrator().registry().keys().len(),
        cache_capacity = config.cache.client_config_capacity,
        "quote service assembled"
    );

    Ok(Application { config, db_pool, service: Arc::new(service) })
}

#[cfg(test)]
mod tests {
    use gendra_core::config::{ConfigOverrides, LoadOptions};
    use gendra_core::domain::client::ClientId;
    use gendra_db::DemoClientDataset;
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::bootstrap::bootstrap;
    use crate::service::QuoteRequest;

    fn in_memory(floor_price: Option<Decimal>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                floor_price,
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_negative_floor_price() {
        let result = bootstrap(in_memory(Some(Decimal::new(-1, 0)))).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("floor_price"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_schema_seed_and_quote_path() {
        let app = bootstrap(in_memory(None)).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('client_configs', 'quotes', 'leads')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables should exist after bootstrap");
        assert_eq!(table_count, 3);

        DemoClientDataset::load(app.service.clients().source().as_ref())
            .await
            .expect("seed demo clients");

        let request: QuoteRequest = serde_json::from_value(json!({
            "service_type": "metal_fab",
            "quantity": 10,
            "complexity": 2.0
        }))
        .expect("request");
        let response = app
            .service
            .quote(request, Some(ClientId("metalworks-demo".to_string())))
            .await
            .expect("quote");

        // Seeded unit rate 7.50 on the base formula: 10 * 7.5 * 2.
        assert_eq!(response.quote, Decimal::new(150, 0));

        let (logged,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM quotes WHERE client_id = 'metalworks-demo'")
                .fetch_one(&app.db_pool)
                .await
                .expect("count quotes");
        assert_eq!(logged, 1);

        app.db_pool.close().await;
    }
}
