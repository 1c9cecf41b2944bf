//! MiPropina server entry point.

use anyhow::{Context, Result};
use mipropina_server::{ServerConfig, build_state, create_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mipropina=info,tower_http=info")),
        )
        .json()
        .init();

    info!("Starting MiPropina server...");

    mipropina_identity::token::install_crypto_provider();

    let config = ServerConfig::from_env().context("Failed to load configuration")?;
    let state = build_state(&config).await?;
    let app = create_router(state);

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!(%addr, "MiPropina server listening");

    axum::serve(listener, app).await.context("Server error")?;

    info!("MiPropina server stopped.");
    Ok(())
}
