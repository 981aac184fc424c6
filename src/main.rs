use std::sync::Arc;

use clover_api::{
    config::Config,
    routes::{create_router, AppState},
    services::providers::{BookAiProvider, GeminiProvider},
    store::create_store,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clover_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store = create_store(&config)?;
    let provider: Arc<dyn BookAiProvider> = Arc::new(GeminiProvider::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
    ));

    tracing::info!(
        provider = provider.name(),
        freshness_window_secs = config.freshness_window_secs,
        max_recommendations = config.max_recommendations,
        "Recommendation service configured"
    );

    let app = create_router(AppState::new(provider, store, &config));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
