mod handlers;
mod models;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub use handlers::{
    ask, index, not_found, relay, test_route, LIVENESS_BANNER, TEST_ROUTE_MESSAGE,
};
pub use models::{AskRequest, AskResponse, ErrorResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/test", get(test_route))
        .route("/ask", post(ask))
        .fallback(not_found)
        .with_state(state)
}
