//! Input submission - POST /api/input
//!
//! Resolves a pending `input_required` request: looks the token up in the
//! shared input broker and delivers the value to the run blocked on it.
//! An unknown or already-consumed token is a normal client error (404),
//! not a system fault.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crewline_core::CoreError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/input", post(submit_input))
}

#[derive(Debug, Deserialize)]
pub struct InputSubmission {
    id: Option<String>,
    input: Option<String>,
}

/// POST /api/input — Deliver a human-supplied value to a waiting run.
async fn submit_input(
    State(state): State<AppState>,
    Json(body): Json<InputSubmission>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let id = body
        .id
        .ok_or_else(|| CoreError::BadRequest("Missing 'id' field".to_string()))?;
    let input = body
        .input
        .ok_or_else(|| CoreError::BadRequest("Missing 'input' field".to_string()))?;

    state.broker.deliver(&id, input)?;
    tracing::info!("[Input] delivered input for id {}", id);

    Ok(Json(serde_json::json!({ "message": "input received" })))
}
