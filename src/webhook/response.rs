//! Maps pipeline outcomes to HTTP responses.
//!
//! | Outcome                                   | Status | Body                                   |
//! |-------------------------------------------|--------|----------------------------------------|
//! | success                                   | 200    | `{"result":"success"}`                 |
//! | bad or missing credential                 | 401    | `{"result":"unauthorized"}`            |
//! | unreadable / malformed body               | 400    | `{"error":"Error ..."}` (generic)      |
//! | missing field, bad branch, unknown task   | 400    | `{"error":"<message>"}`                |
//! | missing post-update script                | 400    | `{"error":"<message>"}`                |
//! | sync or execution failure                 | 500    | `{"error":"<message>","details":"..."}`|
//!
//! Decode errors are never echoed back; the parse error is only logged.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::errors::WebhookError;

pub const READ_BODY_ERROR: &str = "Error reading body";
pub const DECODE_ERROR: &str = "Error decoding webhook";

/// The task ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Success;

impl IntoResponse for Success {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(json!({ "result": "success" }))).into_response()
    }
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Unauthorized => StatusCode::UNAUTHORIZED,
            WebhookError::BodyUnreadable(_)
            | WebhookError::MalformedPayload(_)
            | WebhookError::MissingField(_)
            | WebhookError::InvalidBranch(_)
            | WebhookError::UnknownTask(_)
            | WebhookError::ScriptNotFound(_) => StatusCode::BAD_REQUEST,
            WebhookError::SyncFailed { .. } | WebhookError::ExecutionFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            WebhookError::Unauthorized => json!({ "result": "unauthorized" }),
            WebhookError::BodyUnreadable(_) => json!({ "error": READ_BODY_ERROR }),
            WebhookError::MalformedPayload(_) => json!({ "error": DECODE_ERROR }),
            WebhookError::MissingField(_)
            | WebhookError::InvalidBranch(_)
            | WebhookError::UnknownTask(_)
            | WebhookError::ScriptNotFound(_) => json!({ "error": self.to_string() }),
            WebhookError::SyncFailed { output, source, .. }
            | WebhookError::ExecutionFailed { output, source, .. } => {
                let details = if output.is_empty() {
                    source.to_string()
                } else {
                    output.clone()
                };
                json!({ "error": self.to_string(), "details": details })
            }
        };
        (status, Json(body)).into_response()
    }
}
