use tracing_subscriber::EnvFilter;

use fintrack_api::app::app;
use fintrack_api::config::AppConfig;
use fintrack_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,audit=info")),
        )
        .init();

    let config = AppConfig::from_env().validate()?;
    tracing::info!("Starting FinTrack API in {:?} mode", config.environment);

    let port = config.api.port;
    let state = AppState::initialize(config).await?;

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("FinTrack API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
