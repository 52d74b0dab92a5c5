//! HTTP route handlers for Usher.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use vouch_common::VouchError;

use crate::state::AppState;

mod flow;
mod health;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/metrics", get(health::metrics))

        // Verified-submission flow
        .route("/flow", post(flow::start_flow))
        .route("/flow/{id}", get(flow::flow_status).delete(flow::cancel_flow))
        .route("/flow/{id}/identity", post(flow::submit_identity))
        .route("/flow/{id}/identity/edit", post(flow::edit_identity))
        .route("/flow/{id}/code/digit", post(flow::enter_digit))
        .route("/flow/{id}/code/backspace", post(flow::backspace))
        .route("/flow/{id}/code/paste", post(flow::paste))
        .route("/flow/{id}/verify", post(flow::verify))
        .route("/flow/{id}/resend", post(flow::resend))
        .route("/flow/{id}/submit", post(flow::submit_content))

        // The flow is driven from a browser UI
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())

        // Add shared state
        .with_state(state)
}

/// Error wrapper mapping the common taxonomy onto HTTP responses
pub struct ApiError(VouchError);

impl From<VouchError> for ApiError {
    fn from(err: VouchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "error": self.0.to_string(),
            "retryable": self.0.is_retryable(),
        }));
        (status, body).into_response()
    }
}
