use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ApiError;
use crate::provider::{ProviderError, TextGenerator};
use crate::AppState;

use super::models::{AskRequest, AskResponse, ErrorResponse};

pub const LIVENESS_BANNER: &str = "👋 Ask Relay is LIVE! Use the /ask endpoint to chat.";
pub const TEST_ROUTE_MESSAGE: &str = "Test route is functional.";

pub async fn index() -> &'static str {
    LIVENESS_BANNER
}

pub async fn test_route() -> &'static str {
    TEST_ROUTE_MESSAGE
}

pub async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "rejected malformed /ask body");
        ApiError::MalformedBody(rejection.body_text())
    })?;

    let question = payload.question.unwrap_or_default();
    if question.is_empty() {
        tracing::warn!("rejected /ask without a question");
        return Err(ApiError::MissingQuestion);
    }

    let reply = relay(state.generator.as_ref(), &question)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to relay question");
            ApiError::from(err)
        })?;

    Ok(Json(AskResponse { reply }))
}

/// Sends `prompt` unchanged and returns the trimmed reply. An empty reply is
/// a provider failure, never a success.
pub async fn relay(generator: &dyn TextGenerator, prompt: &str) -> Result<String, ProviderError> {
    let text = generator.generate(prompt).await?;

    let reply = text.trim();
    if reply.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(reply.to_string())
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
            details: None,
        }),
    )
        .into_response()
}
