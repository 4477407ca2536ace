use std::net::SocketAddr;

use anyhow::Context;

use chirpy_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chirpy_observability::init();

    let config = ApiConfig::from_env()?;
    let app = chirpy_api::app::build_app(&config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, platform = ?config.platform, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
