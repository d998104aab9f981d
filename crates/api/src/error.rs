//! API error type and the JSON error envelope.

use crate::models::{ErrorBody, ErrorResponse, FieldError};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use meteora_lp_domain::DomainError;
use meteora_lp_protocols::SourceError;
use thiserror::Error;
use tracing::{error, warn};

/// Message returned for upstream failures; details stay in the logs.
pub const UPSTREAM_MESSAGE: &str = "Upstream service unavailable, try again later";

/// Message returned when a client exceeds its quota.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later";

/// Errors returned by API handlers.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Request failed validation.
    #[error("{message}")]
    InvalidInput {
        /// Summary.
        message: String,
        /// Per-field problems.
        details: Vec<FieldError>,
    },
    /// Missing or unknown API key.
    #[error("{0}")]
    Unauthorized(String),
    /// Client exceeded its request quota.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the next request is admitted.
        retry_after_secs: u64,
    },
    /// RPC or another dependency failed after retries.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Invalid input on a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::InvalidInput {
            message: message.clone(),
            details: vec![FieldError {
                field: field.into(),
                message,
            }],
        }
    }

    /// Invalid input on several fields.
    pub fn invalid_fields(details: Vec<FieldError>) -> Self {
        Self::InvalidInput {
            message: "Request validation failed".to_string(),
            details,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a stale cached value may stand in for this failure.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let (message, details) = match self {
            Self::InvalidInput { message, details } => (message, Some(details)),
            Self::UpstreamUnavailable(cause) => {
                error!(cause = %cause, "Upstream failure");
                (UPSTREAM_MESSAGE.to_string(), None)
            }
            Self::Internal(cause) => {
                error!(cause = %cause, "Internal error");
                ("Internal server error".to_string(), None)
            }
            Self::RateLimited { .. } => (RATE_LIMIT_MESSAGE.to_string(), None),
            Self::NotFound(message) | Self::Unauthorized(message) => (message, None),
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorBody { message, details },
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Upstream(cause) => Self::UpstreamUnavailable(cause),
            SourceError::AccountNotFound(address) => {
                Self::NotFound(format!("Account {address} not found"))
            }
            SourceError::Decode { address, source } => {
                warn!(address = %address, error = %source, "Decode anomaly");
                Self::NotFound(format!("Account {address} is not a recognised pool"))
            }
            SourceError::InvalidAddress(value) => {
                Self::invalid_field("address", format!("'{value}' is not a valid address"))
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let field = match &e {
            DomainError::ZeroAmount { field } => (*field).to_string(),
            DomainError::ExceedsSupply { .. } => "lpTokenAmount".to_string(),
            DomainError::SlippageExceeded { field, .. } => (*field).to_string(),
            DomainError::IdenticalMints { .. } => {
                return Self::NotFound(e.to_string());
            }
        };
        Self::invalid_field(field, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_field("body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_field("query", rejection.body_text())
    }
}
