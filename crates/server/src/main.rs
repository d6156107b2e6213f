mod api;
mod bootstrap;
mod error;
mod health;
mod service;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gendra_core::config::{AppConfig, LoadOptions};
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;

fn init_logging(config: &AppConfig) {
    use gendra_core::config::LogFormat::*;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap emits its first event.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = app.config.socket_address();
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    let registered_schemas = app.service.orchestrator().registry().keys().len();
    let router = health::router(health::HealthState { db_pool: app.db_pool.clone(), registered_schemas })
        .merge(api::router(api::AppState {
            service: app.service.clone(),
            admin_token: app.config.server.admin_token.clone(),
        }))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        admin_token_configured = app.config.server.admin_token.is_some(),
        "gendra-server listening"
    );

    let draining = Arc::new(Notify::new());
    let drain_signal = draining.clone();
    let mut serve = Box::pin(
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { drain_signal.notified().await })
            .into_future(),
    );

    tokio::select! {
        result = &mut serve => result?,
        signal = wait_for_shutdown() => {
            signal?;
            tracing::info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "draining in-flight requests"
            );
            draining.notify_one();
            match tokio::time::timeout(grace, &mut serve).await {
                Ok(result) => result?,
                Err(_) => tracing::warn!(
                    event_name = "system.server.drain_timeout",
                    correlation_id = "shutdown",
                    grace_secs = grace.as_secs(),
                    "grace period elapsed with requests still in flight"
                ),
            }
        }
    }

    app.db_pool.close().await;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "gendra-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
