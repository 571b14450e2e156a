use std::sync::Arc;

use afz_server::{AppState, LogMailer, ServerConfig, router};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,afz_server=debug")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "server.yaml".to_owned());
    let config = ServerConfig::from_file(&path)
        .with_context(|| format!("failed to load server config from {path}"))?;

    let app = router(AppState::new(Arc::new(LogMailer::new()), config.mail));
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    tracing::info!(address = %config.listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "cannot listen for shutdown signal");
            }
        })
        .await
        .context("server error")
}
