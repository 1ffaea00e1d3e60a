//! Shared response shaping for the replay mock endpoints.
//!
//! The original mock routes always return a 200/400/500 JSON body keyed
//! `rts_status` — never a structured error envelope — so handlers build
//! these directly rather than going through a generic API error type.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// Outcome of replaying a mocked bureau call: either the recorded response
/// and status code, or a failure reason that maps to 400 (validation
/// mismatch) or 500 (lookup/decode failure).
pub enum MockOutcome {
    Replay { body: Value, status: u16 },
    ValidationFailed(String),
    LookupFailed(String),
}

impl IntoResponse for MockOutcome {
    fn into_response(self) -> axum::response::Response {
        match self {
            MockOutcome::Replay { body, status } => {
                let code = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
                (code, Json(body)).into_response()
            }
            MockOutcome::ValidationFailed(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "rts_status": message })),
            )
                .into_response(),
            MockOutcome::LookupFailed(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "rts_status": message })),
            )
                .into_response(),
        }
    }
}
