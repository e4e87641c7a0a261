use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use candle_sentiment::analyzer::Analyzer;
use candle_sentiment::api::{build_router, AppState};
use candle_sentiment::config::Settings;
use candle_sentiment::registry::ModelRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| settings.log_filter().into()),
        )
        .init();

    let source = settings.model_source();
    let registry = ModelRegistry::new(Arc::new(source));
    let analyzer = Analyzer::new(
        registry,
        settings.limits(),
        settings.features(),
        settings.history_capacity,
    );
    let models = analyzer.models();
    let app = build_router(AppState::new(analyzer), &settings.static_dir);

    let addr = settings.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        sentiment = %models.sentiment,
        emotion = %models.emotion,
        aspect = %models.aspect,
        device = %settings.device,
        "models load on first use"
    );
    info!(features = ?settings.features(), limits = ?settings.limits(), "configuration");
    info!("listening on http://{addr}");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
