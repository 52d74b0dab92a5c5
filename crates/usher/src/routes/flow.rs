//! Verified-submission flow endpoints.
//!
//! One route per user-initiated action; every submit maps to exactly one
//! remote call inside the engine. Errors surface as `{"error": ...}` with
//! the status code from the `VouchError` taxonomy.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use vouch_common::Testimonial;

use crate::flow::{ContentFields, FlowStatus};
use crate::state::AppState;

use super::ApiError;

#[derive(Serialize)]
pub struct StartResponse {
    session_id: String,
}

/// Open a fresh flow
pub async fn start_flow(State(state): State<AppState>) -> Json<StartResponse> {
    let session_id = state.engine.start().await;
    Json(StartResponse { session_id })
}

/// Snapshot of phase, cooldown and code-entry state
pub async fn flow_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlowStatus>, ApiError> {
    Ok(Json(state.engine.status(&id).await?))
}

#[derive(Deserialize)]
pub struct IdentityRequest {
    name: String,
    email: String,
}

/// Phase 1 submit: capture identity, dispatch a code
pub async fn submit_identity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<IdentityRequest>,
) -> Result<Json<FlowStatus>, ApiError> {
    state
        .engine
        .submit_identity(&id, &payload.name, &payload.email)
        .await?;
    Ok(Json(state.engine.status(&id).await?))
}

/// "Wrong email, go back": return to the identity phase
pub async fn edit_identity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlowStatus>, ApiError> {
    Ok(Json(state.engine.edit_identity(&id).await?))
}

#[derive(Deserialize)]
pub struct DigitRequest {
    digit: char,
}

/// Type one digit into the focused code cell
pub async fn enter_digit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<DigitRequest>,
) -> Result<Json<FlowStatus>, ApiError> {
    Ok(Json(state.engine.enter_digit(&id, payload.digit).await?))
}

/// Backspace in the code row
pub async fn backspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlowStatus>, ApiError> {
    Ok(Json(state.engine.backspace(&id).await?))
}

#[derive(Deserialize)]
pub struct PasteRequest {
    text: String,
}

/// Bulk paste into the code row
pub async fn paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<PasteRequest>,
) -> Result<Json<FlowStatus>, ApiError> {
    Ok(Json(state.engine.paste(&id, &payload.text).await?))
}

/// Phase 2 submit: verify the entered code
pub async fn verify(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlowStatus>, ApiError> {
    state.engine.submit_code(&id).await?;
    Ok(Json(state.engine.status(&id).await?))
}

/// Re-dispatch a code once the cooldown allows
pub async fn resend(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlowStatus>, ApiError> {
    state.engine.resend(&id).await?;
    Ok(Json(state.engine.status(&id).await?))
}

/// Phase 3 submit: persist the testimonial and close the flow.
/// Returns the canonical stored record for immediate list insertion.
pub async fn submit_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ContentFields>,
) -> Result<Json<Testimonial>, ApiError> {
    Ok(Json(state.engine.submit_content(&id, payload).await?))
}

/// Cancel the flow, discarding the session
pub async fn cancel_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    state.engine.cancel(&id).await?;
    Ok(Json(CancelResponse { cancelled: true }))
}

#[derive(Serialize)]
pub struct CancelResponse {
    cancelled: bool,
}
