use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use model_server::{router, runtime_reload, AppState, ServeConfig};
use modelops::Registry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServeConfig::from_env()?;
    let registry = Registry::from_env();
    let state = AppState::new(cfg.clone(), registry)?.shared();

    // no model, no traffic
    let version = runtime_reload::startup_load(&state)
        .await
        .context("Failed to load model at startup")?;
    info!(model_version = %version, "model ready");

    let app = router(state);

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("model server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("model server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
