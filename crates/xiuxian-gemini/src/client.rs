//! `GeminiClient` - direct REST implementation of the generation port.
//!
//! Every call is stateless: the full conversation history is replayed as
//! `contents`, and JSON output mode is always requested.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};
use xiuxian_core::error::GenerationError;
use xiuxian_core::generation::{GenerationClient, GenerationRequest};

use crate::wire::{
    Content, ErrorWrapper, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};

/// Model used unless overridden.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Public endpoint prefix; the model name and method are appended.
pub const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Generation client that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client for the default model. An empty key is accepted
    /// here and reported as `MissingCredential` on the first call.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            base_url: BASE_URL.to_owned(),
        }
    }

    /// Overrides the model after construction.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the client at another endpoint prefix.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Model name in use.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

fn build_body(request: &GenerationRequest) -> GenerateContentRequest {
    let contents = request
        .history
        .iter()
        .chain(std::iter::once(&request.turn))
        .map(Content::from_turn)
        .collect();
    GenerateContentRequest {
        contents,
        system_instruction: request.system_instruction.as_deref().map(Content::instruction),
        generation_config: GenerationConfig::default(),
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model, history = request.history.len()))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if self.api_key.trim().is_empty() {
            return Err(GenerationError::MissingCredential);
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|err| GenerationError::Upstream(format!("Gemini request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read Gemini error body".to_owned());
            let error = map_http_error(status, &body);
            warn!(status = status.as_u16(), error = %error, "Gemini returned an error");
            return Err(error);
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            GenerationError::Upstream(format!("failed to parse Gemini response: {err}"))
        })?;
        let text = extract_text(parsed)?;
        debug!(bytes = text.len(), "Gemini response received");
        Ok(text)
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

/// Classifies a non-success response.
///
/// 503 (and any body reporting overload) is transient. Rejected keys come
/// back as 400 with `API_KEY_INVALID`, or as 401/403.
fn map_http_error(status: StatusCode, body: &str) -> GenerationError {
    let (message, invalid_key) = match serde_json::from_str::<ErrorWrapper>(body) {
        Ok(wrapper) => {
            let invalid_key = wrapper
                .error
                .details
                .iter()
                .any(|detail| detail.get("reason").and_then(|r| r.as_str()) == Some("API_KEY_INVALID"));
            let text = wrapper.error.message.unwrap_or_else(|| body.to_owned());
            let message = match wrapper.error.status {
                Some(status_text) if !status_text.is_empty() => format!("{status_text}: {text}"),
                _ => text,
            };
            (message, invalid_key)
        }
        Err(_) => (body.to_owned(), false),
    };

    let lowered = message.to_ascii_lowercase();
    if status == StatusCode::SERVICE_UNAVAILABLE || lowered.contains("overloaded") {
        GenerationError::Overloaded(message)
    } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || invalid_key
        || message.contains("API_KEY_INVALID")
        || lowered.contains("api key not valid")
    {
        GenerationError::InvalidCredential(message)
    } else {
        GenerationError::Upstream(format!("status {}: {message}", status.as_u16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use xiuxian_core::conversation::ConversationTurn;

    fn request() -> GenerationRequest {
        GenerationRequest {
            history: vec![
                ConversationTurn::user("遊戲開始"),
                ConversationTurn::model(r#"{"title":"山門"}"#),
            ],
            turn: ConversationTurn::user("拜師"),
            system_instruction: Some("persona".to_owned()),
        }
    }

    #[test]
    fn test_body_replays_history_then_new_turn() {
        // Act
        let body = serde_json::to_value(build_body(&request())).unwrap();

        // Assert
        let roles: Vec<&str> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|content| content["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(body["contents"][2]["parts"][0]["text"], "拜師");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "persona");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_body_omits_absent_system_instruction() {
        let mut request = request();
        request.system_instruction = None;

        let body: Value = serde_json::to_value(build_body(&request)).unwrap();

        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"title\":" }, { "text": "\"山門\"}" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();

        assert_eq!(extract_text(response).unwrap(), r#"{"title":"山門"}"#);
    }

    #[test]
    fn test_extract_text_reports_empty_response() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();

        assert_eq!(extract_text(response), Err(GenerationError::EmptyResponse));
    }

    #[test]
    fn test_service_unavailable_is_overload() {
        let body = r#"{"error":{"code":503,"message":"The model is overloaded. Please try again later.","status":"UNAVAILABLE"}}"#;

        let error = map_http_error(StatusCode::SERVICE_UNAVAILABLE, body);

        assert!(error.is_transient());
        assert_eq!(
            error,
            GenerationError::Overloaded(
                "UNAVAILABLE: The model is overloaded. Please try again later.".to_owned()
            )
        );
    }

    #[test]
    fn test_api_key_invalid_reason_is_invalid_credential() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{ "reason": "API_KEY_INVALID" }]
            }
        })
        .to_string();

        let error = map_http_error(StatusCode::BAD_REQUEST, &body);

        assert!(matches!(error, GenerationError::InvalidCredential(_)));
    }

    #[test]
    fn test_forbidden_is_invalid_credential() {
        let error = map_http_error(StatusCode::FORBIDDEN, "denied");
        assert_eq!(error, GenerationError::InvalidCredential("denied".to_owned()));
    }

    #[test]
    fn test_other_statuses_are_upstream_failures() {
        let error = map_http_error(StatusCode::INTERNAL_SERVER_ERROR, "boom");

        assert_eq!(error, GenerationError::Upstream("status 500: boom".to_owned()));
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn test_blank_key_fails_without_a_request() {
        let client = GeminiClient::new("  ").with_base_url("http://127.0.0.1:9");

        let result = client.generate(&request()).await;

        assert_eq!(result, Err(GenerationError::MissingCredential));
    }
}
