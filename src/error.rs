use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::ErrorResponse;
use crate::provider::ProviderError;

const AUTH_GUIDANCE: &str =
    "Invalid or unauthorized API Key. Check the GEMINI_API_KEY environment variable.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Question is required")]
    MissingQuestion,

    #[error("invalid request body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingQuestion | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Provider(ProviderError::Authentication(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error, details) = match self {
            ApiError::MissingQuestion => ("Question is required", None),
            ApiError::MalformedBody(msg) => ("Invalid request body", Some(msg)),
            ApiError::Provider(ProviderError::MissingApiKey) => (
                "Configuration Error",
                Some(ProviderError::MissingApiKey.to_string()),
            ),
            ApiError::Provider(ProviderError::Authentication(_)) => {
                ("Authentication Error", Some(AUTH_GUIDANCE.to_string()))
            }
            ApiError::Provider(err) => ("AI Response Error", Some(err.to_string())),
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                details,
            }),
        )
            .into_response()
    }
}
