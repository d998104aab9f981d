//! API key authentication.
//!
//! When at least one key is configured, protected routes require a matching
//! `X-API-Key` header. With no keys configured every request passes.

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Authentication configuration.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Accepted API keys.
    pub api_keys: HashSet<String>,
}

impl AuthConfig {
    /// Parses a comma-separated key list; blanks are ignored.
    pub fn from_key_list(list: &str) -> Self {
        Self {
            api_keys: list
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Authentication state shared across handlers.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    config: Arc<AuthConfig>,
}

impl AuthState {
    /// Creates a new authentication state.
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Checks if authentication is required.
    #[must_use]
    pub fn require_auth(&self) -> bool {
        !self.config.api_keys.is_empty()
    }

    /// Validates an API key.
    #[must_use]
    pub fn validate_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Header absent.
    #[error("Missing API key")]
    MissingApiKey,
    /// Header present but not a configured key.
    #[error("Invalid API key")]
    InvalidApiKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::Unauthorized(self.to_string()).into_response()
    }
}

/// Extracts the API key from request headers.
pub fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// API key middleware for protected routes.
pub async fn api_key_middleware(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !auth.require_auth() {
        return Ok(next.run(request).await);
    }

    match extract_api_key(request.headers()) {
        Some(key) if auth.validate_api_key(key) => {
            debug!("API key accepted");
            Ok(next.run(request).await)
        }
        Some(_) => {
            warn!(path = %request.uri().path(), "Rejected request with invalid API key");
            Err(AuthError::InvalidApiKey)
        }
        None => {
            warn!(path = %request.uri().path(), "Rejected request without API key");
            Err(AuthError::MissingApiKey)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_key_list_parsing() {
        let config = AuthConfig::from_key_list(" alpha, ,beta ,");
        assert_eq!(config.api_keys.len(), 2);
        assert!(config.api_keys.contains("alpha"));
        assert!(config.api_keys.contains("beta"));
    }

    #[test]
    fn test_auth_optional_without_keys() {
        assert!(!AuthState::default().require_auth());
        let state = AuthState::new(AuthConfig::from_key_list("alpha"));
        assert!(state.require_auth());
        assert!(state.validate_api_key("alpha"));
        assert!(!state.validate_api_key("ALPHA"));
    }

    #[test]
    fn test_extract_api_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers), None);

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("alpha"));
        assert_eq!(extract_api_key(&headers), Some("alpha"));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("  "));
        assert_eq!(extract_api_key(&headers), None);
    }
}
