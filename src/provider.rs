use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,

    #[error("{0}")]
    Authentication(String),

    #[error("request to Gemini failed: {0}")]
    Network(String),

    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Gemini blocked the request: {0}")]
    Blocked(String),

    #[error("failed to parse Gemini response: {0}")]
    InvalidResponse(String),

    #[error("Gemini returned an empty response")]
    EmptyResponse,
}

/// The one provider operation the relay needs. [`GeminiClient`] implements
/// it over the `generateContent` REST endpoint.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for `prompt` in a single, non-streaming call.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

pub struct GeminiClient {
    config: ProviderConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        extract_text(parsed)
    }
}

/// Maps a non-2xx Gemini response onto [`ProviderError`].
///
/// When the body is the usual JSON error envelope, only a key-related
/// `ErrorInfo.reason` or the `UNAUTHENTICATED` status count as credential
/// failures; a 403 `PERMISSION_DENIED` for a valid key without model access
/// stays a generic API error. Without an envelope a 401 status counts. The key
/// error markers in the raw body are a best-effort fallback either way.
fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);

    let message = envelope
        .as_ref()
        .and_then(|error| error.message.clone())
        .unwrap_or_else(|| body.trim().to_string());

    let structured = match envelope.as_ref() {
        Some(error) => is_credential_error(error),
        None => status == StatusCode::UNAUTHORIZED,
    };
    let credential_failure =
        structured || body.contains("API_KEY_INVALID") || body.contains("API key not valid");

    if credential_failure {
        return ProviderError::Authentication(message);
    }

    ProviderError::Api {
        status: status.as_u16(),
        message,
    }
}

fn is_credential_error(error: &ErrorBody) -> bool {
    error.status.as_deref() == Some("UNAUTHENTICATED")
        || error.details.iter().any(|detail| {
            matches!(
                detail.reason.as_deref(),
                Some("API_KEY_INVALID") | Some("API_KEY_SERVICE_BLOCKED")
            )
        })
}

/// Concatenates the text parts of the first candidate, the same way the
/// official SDKs build `response.text()`.
fn extract_text(response: GenerateContentResponse) -> Result<String, ProviderError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => Err(ProviderError::Blocked(format!("prompt blocked ({reason})"))),
            None => Err(ProviderError::EmptyResponse),
        };
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r != "STOP") {
            return Err(ProviderError::Blocked(format!("candidate finished with {reason}")));
        }
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> GenerateContentResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn invalid_key_reason_is_an_authentication_failure() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"@type":"type.googleapis.com/google.rpc.ErrorInfo","reason":"API_KEY_INVALID","domain":"googleapis.com"}]}}"#;

        match classify_failure(StatusCode::BAD_REQUEST, body) {
            ProviderError::Authentication(message) => {
                assert_eq!(message, "API key not valid. Please pass a valid API key.")
            }
            other => panic!("expected authentication failure, got {other:?}"),
        }
    }

    #[test]
    fn unauthenticated_status_is_an_authentication_failure() {
        let body = r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#;

        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, body),
            ProviderError::Authentication(_)
        ));
    }

    #[test]
    fn model_permission_denied_stays_generic() {
        let body = r#"{"error":{"code":403,"message":"Permission denied on resource project.","status":"PERMISSION_DENIED"}}"#;

        match classify_failure(StatusCode::FORBIDDEN, body) {
            ProviderError::Api { status, .. } => assert_eq!(status, 403),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn unstructured_401_is_an_authentication_failure() {
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, "Unauthorized"),
            ProviderError::Authentication(_)
        ));
    }

    #[test]
    fn unstructured_body_falls_back_to_substring_match() {
        let body = "upstream said API_KEY_INVALID";

        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, body),
            ProviderError::Authentication(_)
        ));
    }

    #[test]
    fn quota_errors_stay_generic() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;

        match classify_failure(StatusCode::TOO_MANY_REQUESTS, body) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn text_parts_are_concatenated() {
        let response = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello, "},{"text":"world"}]},"finishReason":"STOP"}]}"#,
        );

        assert_eq!(extract_text(response).unwrap(), "Hello, world");
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);

        match extract_text(response) {
            Err(ProviderError::Blocked(reason)) => assert!(reason.contains("SAFETY")),
            other => panic!("expected blocked prompt, got {other:?}"),
        }
    }

    #[test]
    fn no_candidates_is_an_empty_response() {
        let response = parse("{}");

        assert!(matches!(
            extract_text(response),
            Err(ProviderError::EmptyResponse)
        ));
    }

    #[test]
    fn request_body_matches_generate_content_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some("What is 2+2?".to_string()),
                }],
            }],
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "What is 2+2?" }] }]
            })
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = GeminiClient::new(ProviderConfig {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
        });

        assert!(matches!(
            client.generate("hello").await,
            Err(ProviderError::MissingApiKey)
        ));
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let client = GeminiClient::new(ProviderConfig {
            api_key: Some("key".to_string()),
            model: "gemini-1.5-flash".to_string(),
            base_url: "http://localhost:8080/v1beta/".to_string(),
        });

        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
