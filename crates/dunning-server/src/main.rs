//! Dunning API server entry point.

use std::future::Future;

use anyhow::Context;
use dunning_db::DbManager;
use dunning_server::app::{ApiSettings, AppState, build_router};
use dunning_server::config::ServerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("load server configuration")?;
    init_tracing(&config);

    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
    })
    .await
}

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    if config.environment.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run_with_shutdown<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let db = DbManager::connect(&config.database)
        .await
        .context("connect to SurrealDB")?;

    let state = AppState::new(
        db.client().clone(),
        config.auth.clone(),
        ApiSettings {
            public_signup: config.public_signup,
            expose_internal_errors: config.environment.is_development(),
        },
    );

    if let Err(e) = state.auth.purge_expired().await {
        tracing::warn!(error = %e, "Could not purge expired refresh tokens");
    }

    let app = build_router(state);

    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, environment = ?config.environment, "Dunning API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
