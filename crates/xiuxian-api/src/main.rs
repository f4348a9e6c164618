//! Xiuxian narrative engine API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use xiuxian_api::config::AppConfig;
use xiuxian_api::state::AppState;
use xiuxian_core::clock::SystemClock;
use xiuxian_core::rng::StdRandom;
use xiuxian_gemini::GeminiClient;
use xiuxian_session::application::controller::{ControllerConfig, SessionController};
use xiuxian_session::application::illustration::EndingIllustrator;
use xiuxian_session::application::retry::RetryPolicy;
use xiuxian_store::file_snapshot_store::FileSnapshotStore;
use xiuxian_unsplash::UnsplashClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Xiuxian API server");

    let config = AppConfig::from_env()?;
    tracing::info!(config = ?config, "configuration loaded");
    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; every session will fail to generate");
    }
    if config.unsplash_access_key.is_empty() {
        tracing::warn!("UNSPLASH_ACCESS_KEY is not set; ending images are unavailable");
    }

    let mut gemini =
        GeminiClient::new(config.gemini_api_key.clone()).with_model(config.gemini_model.clone());
    if let Some(base_url) = &config.gemini_base_url {
        gemini = gemini.with_base_url(base_url.clone());
    }

    let controller = SessionController::new(
        Arc::new(gemini),
        Arc::new(FileSnapshotStore::new(config.save_dir.clone())),
        Arc::new(SystemClock),
        ControllerConfig {
            retry: RetryPolicy {
                base_delay: config.retry_base_delay,
                ..RetryPolicy::default()
            },
            ..ControllerConfig::default()
        },
    );
    let has_save = controller.refresh_has_save().await;
    tracing::info!(has_save, save_dir = %config.save_dir.display(), "snapshot store ready");

    let illustrator = EndingIllustrator::new(
        Arc::new(UnsplashClient::new(config.unsplash_access_key.clone())),
        Box::new(StdRandom::from_os()),
    );
    let app_state = AppState::new(Arc::new(controller), Arc::new(illustrator));

    // TODO: Replace CorsLayer::permissive() with the front end's origin once it is deployed.
    let app = xiuxian_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
