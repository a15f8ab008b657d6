pub mod chat;
pub mod feed;
pub mod health;

use axum::http::HeaderMap;

use crate::core::errors::ApiError;

/// The caller's opaque session identity, supplied by the auth layer in
/// front of this service.
pub(crate) fn require_session_key(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-session-key")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::InvalidInput("session key is required".into()))
}
