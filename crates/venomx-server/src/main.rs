mod app;
mod dto;
mod error;
mod handlers;
mod services;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use venomx_config::Settings;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let addr = settings.bind_addr.clone();

    let state = tokio::task::spawn_blocking(move || AppState::initialize(settings))
        .await
        .context("startup task panicked")??;
    let app = app::router(Arc::new(state));

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
