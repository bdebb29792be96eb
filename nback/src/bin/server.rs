use std::sync::Arc;

use anyhow::Context;

use dual_nback::env_config;
use dual_nback::server::{create_router, AppContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_config::init_tracing();
    let port = env_config::server_port();
    let timing = env_config::timing();
    tracing::info!(
        trial_ms = timing.trial.as_millis() as u64,
        pause_ms = timing.pause.as_millis() as u64,
        "starting dual n-back server"
    );

    let app = create_router(Arc::new(AppContext::new(timing)));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!(port, "server is running, press Ctrl+C to stop");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install CTRL+C signal handler: {e}");
        std::future::pending::<()>().await;
    }
}
