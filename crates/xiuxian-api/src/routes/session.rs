//! Routes for the single narrative session.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use xiuxian_session::application::view::SessionView;
use xiuxian_session::domain::settings::{Attributes, GameLength, SessionSettings};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /start.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// Talent points per attribute.
    pub attributes: Attributes,
    /// Explicit turn budget; wins over `length`.
    pub max_turns: Option<u32>,
    /// Preset turn budget, `medium` when neither field is given.
    pub length: Option<GameLength>,
}

impl StartRequest {
    fn into_settings(self) -> Result<SessionSettings, ApiError> {
        match self.max_turns {
            Some(max_turns) => Ok(SessionSettings::new(self.attributes, max_turns)?),
            None => Ok(SessionSettings::from_length(
                self.attributes,
                self.length.unwrap_or(GameLength::Medium),
            )),
        }
    }
}

/// Request body for POST /choice.
#[derive(Debug, Deserialize)]
pub struct ChoiceRequest {
    /// Option text as displayed.
    pub choice: String,
}

/// Response body for POST /ending-image.
#[derive(Debug, Serialize)]
pub struct EndingImageResponse {
    /// Display-ready image URL.
    pub image_url: String,
}

/// GET /
async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.controller.view())
}

/// POST /start
#[instrument(skip(state, request))]
async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let settings = request.into_settings()?;
    info!(max_turns = settings.max_turns, "starting session");
    state.controller.start(settings).await?;
    Ok(Json(state.controller.view()))
}

/// POST /choice
#[instrument(skip(state, request))]
async fn choice(
    State(state): State<AppState>,
    Json(request): Json<ChoiceRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state.controller.send_choice(&request.choice).await?;
    Ok(Json(state.controller.view()))
}

/// POST /continue
#[instrument(skip(state))]
async fn continue_game(State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    state.controller.continue_game().await?;
    Ok(Json(state.controller.view()))
}

/// POST /reset
#[instrument(skip(state))]
async fn reset(State(state): State<AppState>) -> Json<SessionView> {
    state.controller.reset().await;
    Json(state.controller.view())
}

/// POST /ending-image
#[instrument(skip(state))]
async fn ending_image(
    State(state): State<AppState>,
) -> Result<Json<EndingImageResponse>, ApiError> {
    let image_url = state.controller.illustrate_ending(&state.illustrator).await?;
    Ok(Json(EndingImageResponse { image_url }))
}

/// Returns the router for the session.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_session))
        .route("/start", post(start))
        .route("/choice", post(choice))
        .route("/continue", post(continue_game))
        .route("/reset", post(reset))
        .route("/ending-image", post(ending_image))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use xiuxian_core::error::GenerationError;
    use xiuxian_session::application::controller::{ControllerConfig, SessionController};
    use xiuxian_session::application::illustration::EndingIllustrator;
    use xiuxian_session::application::retry::RetryPolicy;
    use xiuxian_test_support::{
        FixedClock, InMemorySnapshotStore, MockRng, ScriptedGenerationClient, StaticImageSearch,
    };

    fn scene(state: &str) -> Result<String, GenerationError> {
        Ok(json!({
            "title": "山門",
            "tags": ["青雲", "山門", "晨霧", "初入"],
            "description": "...",
            "options": if state == "ongoing" { json!(["拜師"]) } else { json!([]) },
            "state": state,
            "ending_keyword": "golden light"
        })
        .to_string())
    }

    fn app_state_with(responses: Vec<Result<String, GenerationError>>) -> AppState {
        let controller = SessionController::new(
            Arc::new(ScriptedGenerationClient::new(responses)),
            Arc::new(InMemorySnapshotStore::default()),
            Arc::new(FixedClock(Utc::now())),
            ControllerConfig {
                retry: RetryPolicy::none(),
                ..ControllerConfig::default()
            },
        );
        let search = StaticImageSearch::new()
            .with_results("golden light", vec!["https://img/golden".to_owned()]);
        let illustrator = EndingIllustrator::new(Arc::new(search), Box::new(MockRng));
        AppState::new(Arc::new(controller), Arc::new(illustrator))
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_of(response: axum::response::Response) -> Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    fn attributes() -> Value {
        json!({ "root_bone": 4, "insight": 3, "luck": 2, "background": 1 })
    }

    #[tokio::test]
    async fn test_start_returns_scene_view() {
        // Arrange
        let app = router().with_state(app_state_with(vec![scene("ongoing")]));
        let body = json!({ "attributes": attributes(), "length": "short" });

        // Act
        let response = app.oneshot(post("/start", &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["phase"], "scene_ready");
        assert_eq!(json["max_turns"], 10);
        assert_eq!(json["current_turn"], 0);
        assert_eq!(json["current_scene"]["title"], "山門");
        assert_eq!(json["has_save"], true);
    }

    #[tokio::test]
    async fn test_start_defaults_to_medium_length() {
        let app = router().with_state(app_state_with(vec![scene("ongoing")]));

        let response = app
            .oneshot(post("/start", &json!({ "attributes": attributes() })))
            .await
            .unwrap();

        assert_eq!(json_of(response).await["max_turns"], 20);
    }

    #[tokio::test]
    async fn test_start_rejects_unbalanced_attributes_with_400() {
        // Arrange
        let app = router().with_state(app_state_with(vec![]));
        let body = json!({
            "attributes": { "root_bone": 10, "insight": 10, "luck": 0, "background": 0 },
            "max_turns": 5
        });

        // Act
        let response = app.oneshot(post("/start", &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_start_rejects_zero_turns_with_400() {
        let app = router().with_state(app_state_with(vec![]));
        let body = json!({ "attributes": attributes(), "max_turns": 0 });

        let response = app.oneshot(post("/start", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_start_returns_422_for_missing_attributes() {
        let app = router().with_state(app_state_with(vec![]));

        let response = app.oneshot(post("/start", &json!({}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_start_maps_overload_to_503() {
        let app = router().with_state(app_state_with(vec![Err(GenerationError::Overloaded(
            "status 503".into(),
        ))]));

        let response = app
            .oneshot(post("/start", &json!({ "attributes": attributes() })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_of(response).await["error"], "upstream_overloaded");
    }

    #[tokio::test]
    async fn test_choice_without_session_returns_409() {
        let app = router().with_state(app_state_with(vec![]));

        let response = app
            .oneshot(post("/choice", &json!({ "choice": "拜師" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_of(response).await["error"], "invalid_state");
    }

    #[tokio::test]
    async fn test_choice_advances_turn() {
        // Arrange
        let state = app_state_with(vec![scene("ongoing"), scene("ongoing")]);
        let app = router().with_state(state.clone());
        app.clone()
            .oneshot(post("/start", &json!({ "attributes": attributes() })))
            .await
            .unwrap();

        // Act
        let response = app
            .oneshot(post("/choice", &json!({ "choice": "拜師" })))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await["current_turn"], 1);
        assert_eq!(state.controller.view().current_turn, 1);
    }

    #[tokio::test]
    async fn test_continue_without_save_returns_404() {
        let app = router().with_state(app_state_with(vec![]));

        let response = app.oneshot(post("/continue", &json!({}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_of(response).await["error"], "no_save_data");
    }

    #[tokio::test]
    async fn test_reset_returns_idle_view() {
        let app = router().with_state(app_state_with(vec![]));

        let response = app.oneshot(post("/reset", &json!({}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["current_scene"], Value::Null);
    }

    #[tokio::test]
    async fn test_ending_image_returns_url_after_ending() {
        // Arrange
        let app = router().with_state(app_state_with(vec![scene("ongoing"), scene("ended")]));
        app.clone()
            .oneshot(post("/start", &json!({ "attributes": attributes() })))
            .await
            .unwrap();
        app.clone()
            .oneshot(post("/choice", &json!({ "choice": "渡劫" })))
            .await
            .unwrap();

        // Act
        let response = app.oneshot(post("/ending-image", &json!({}))).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await["image_url"], "https://img/golden");
    }

    #[tokio::test]
    async fn test_get_session_returns_view() {
        let app = router().with_state(app_state_with(vec![]));
        let request = Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["is_loading"], false);
        assert_eq!(json["has_save"], false);
    }
}
