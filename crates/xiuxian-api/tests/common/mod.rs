//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use xiuxian_core::clock::Clock;
use xiuxian_core::error::GenerationError;
use xiuxian_session::application::controller::{ControllerConfig, SessionController};
use xiuxian_session::application::illustration::EndingIllustrator;
use xiuxian_session::application::retry::RetryPolicy;
use xiuxian_store::file_snapshot_store::FileSnapshotStore;
use xiuxian_test_support::{FixedClock, ScriptedGenerationClient, SequenceRng, StaticImageSearch};

use xiuxian_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app on a real `FileSnapshotStore` in `save_dir`, scripted
/// generation and a canned image index. Uses the same route structure as
/// `main.rs`.
pub fn build_test_app(
    save_dir: &Path,
    generation: Arc<ScriptedGenerationClient>,
    images: StaticImageSearch,
) -> Router {
    let controller = SessionController::new(
        generation,
        Arc::new(FileSnapshotStore::new(save_dir)),
        fixed_clock(),
        ControllerConfig {
            retry: RetryPolicy {
                max_retries: 3,
                base_delay: Duration::ZERO,
            },
            ..ControllerConfig::default()
        },
    );
    let illustrator = EndingIllustrator::new(Arc::new(images), Box::new(SequenceRng::new(vec![1])));
    xiuxian_api::app(AppState::new(Arc::new(controller), Arc::new(illustrator)))
}

/// Scene JSON as the generation service would return it.
pub fn scene(title: &str, state: &str) -> Result<String, GenerationError> {
    let options = if state == "ongoing" {
        serde_json::json!(["拜師", "下山"])
    } else {
        serde_json::json!([])
    };
    Ok(serde_json::json!({
        "title": title,
        "tags": ["青雲", "山門", "晨霧", "初入"],
        "scene_art": ["  ^  "],
        "description": "山門前雲霧繚繞。",
        "options": options,
        "state": state,
        "ending_keyword": "misty peak"
    })
    .to_string())
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
