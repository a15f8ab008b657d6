use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use newsdesk_backend::core::config::AppConfig;
use newsdesk_backend::core::logging;
use newsdesk_backend::server;
use newsdesk_backend::server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    logging::init(config.log_dir.as_deref());

    let state = AppState::initialize(&config).await?;

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
