//! Shared-secret authentication middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::server::SharedState;
use crate::errors::WebhookError;

/// Whitespace-trimmed, case-sensitive comparison. A missing header counts as
/// the empty string.
pub fn is_authorized(supplied: Option<&str>, secret: &str) -> bool {
    supplied.unwrap_or("").trim() == secret.trim()
}

/// Rejects requests whose secret header does not match before the body is
/// read.
pub async fn require_secret(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, WebhookError> {
    let supplied = request
        .headers()
        .get(&state.config.secret_header)
        .and_then(|value| value.to_str().ok());

    if is_authorized(supplied, &state.config.secret_key) {
        Ok(next.run(request).await)
    } else {
        warn!(
            header = %state.config.secret_header,
            present = supplied.is_some(),
            "Rejected webhook with invalid secret"
        );
        Err(WebhookError::Unauthorized)
    }
}
