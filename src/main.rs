use anyhow::Context;
use ask_relay::{build_app, config::AppConfig, run_server, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    if config.provider.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; /ask will answer with a configuration error");
    }

    let address = config.bind_address();
    let model = config.provider.model.clone();
    let app = build_app(AppState::from_config(config.provider));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(%address, %model, "ask-relay listening");
    run_server(listener, app).await.context("server error")?;

    Ok(())
}
