//! Xiuxian API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use xiuxian_core::error::{ImageLookupError, SessionError};

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `SessionError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            SessionError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            SessionError::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
            SessionError::Busy => (StatusCode::CONFLICT, "busy"),
            SessionError::Superseded => (StatusCode::CONFLICT, "superseded"),
            SessionError::NoSaveData => (StatusCode::NOT_FOUND, "no_save_data"),
            SessionError::CorruptSave(_) => (StatusCode::UNPROCESSABLE_ENTITY, "corrupt_save"),
            SessionError::MissingCredential => {
                (StatusCode::SERVICE_UNAVAILABLE, "missing_credential")
            }
            SessionError::InvalidCredential(_) => (StatusCode::BAD_GATEWAY, "invalid_credential"),
            SessionError::TransientUpstreamOverload(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "upstream_overloaded")
            }
            SessionError::MalformedOutput(_) => (StatusCode::BAD_GATEWAY, "malformed_output"),
            SessionError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            SessionError::ImageLookupFailure(ImageLookupError::NoResults(_)) => {
                (StatusCode::NOT_FOUND, "image_not_found")
            }
            SessionError::ImageLookupFailure(ImageLookupError::MissingCredential) => {
                (StatusCode::SERVICE_UNAVAILABLE, "missing_image_credential")
            }
            SessionError::ImageLookupFailure(ImageLookupError::Upstream(_)) => {
                (StatusCode::BAD_GATEWAY, "image_lookup_error")
            }
            SessionError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let body = ErrorBody {
            error: error_code,
            message: self.0.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: SessionError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(SessionError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_busy_and_invalid_state_map_to_409() {
        assert_eq!(status_of(SessionError::Busy), StatusCode::CONFLICT);
        assert_eq!(
            status_of(SessionError::InvalidState("no scene".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_no_save_data_maps_to_404() {
        assert_eq!(status_of(SessionError::NoSaveData), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_corrupt_save_maps_to_422() {
        assert_eq!(
            status_of(SessionError::CorruptSave("checksum mismatch".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_overload_maps_to_503() {
        assert_eq!(
            status_of(SessionError::TransientUpstreamOverload("503".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_upstream_failures_map_to_502() {
        assert_eq!(
            status_of(SessionError::MalformedOutput("not json".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(SessionError::InvalidCredential("bad key".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_missing_image_maps_to_404() {
        assert_eq!(
            status_of(SessionError::ImageLookupFailure(ImageLookupError::NoResults(
                "ascension".into()
            ))),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_body_carries_user_message_not_internal_detail() {
        // Arrange
        let response =
            ApiError(SessionError::MalformedOutput("expected value at line 1".into())).into_response();

        // Act
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        // Assert
        assert_eq!(json["error"], "malformed_output");
        assert!(!json["message"].as_str().unwrap().contains("line 1"));
    }
}
