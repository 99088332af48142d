//! Shared-secret gate for the file routes

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

/// Header carrying the shared secret; header names match case-insensitively
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Whether `headers` satisfy the configured secret
pub fn is_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|token| !token.is_empty()) else {
        return true;
    };

    headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|token| token == expected)
        .unwrap_or(false)
}

pub async fn require_auth_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_authorized(request.headers(), state.settings.server.auth_token.as_deref()) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("rejected request to {}: bad auth token", request.uri().path());
        Err(ApiError::Forbidden)
    }
}
