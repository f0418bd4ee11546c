use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Fallback text sent whenever a completion cannot be produced. Clients
/// render whatever `response` holds, so a failing relay still answers in
/// character.
pub const RECALIBRATING: &str = "EAGLE is recalibrating. Please try again.";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Completion script timed out")]
    Timeout,

    #[error("Failed to run completion script: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Completion script exited with {0}")]
    ScriptFailed(std::process::ExitStatus),

    #[error("Completion script produced no output")]
    EmptyCompletion,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        // Every failure mode maps to one shape: a 500 whose body still
        // carries a usable `response` string.
        let body = serde_json::json!({
            "response": RECALIBRATING,
            "error": self.to_string(),
        });

        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}
