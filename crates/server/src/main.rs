use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use server_api::ApiContext;
use storage::TableDirectory;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app_state;
mod openapi;
mod routes;
mod settings;
mod ws;

use app_state::AppState;
use settings::{load_settings, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let tables = TableDirectory::load(&settings.tables_path);
    let api = ApiContext::new(tables, settings.event_capacity);
    let app = build_router(Arc::new(AppState { api }), &settings)?;

    let bind_addr = settings.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

fn build_router(state: Arc<AppState>, settings: &Settings) -> anyhow::Result<Router> {
    Ok(routes::routes()
        .route("/ws", get(ws::ws_handler))
        .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
        .layer(settings.cors_layer()?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
