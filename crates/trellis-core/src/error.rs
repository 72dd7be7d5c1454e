//! Error types for Trellis
//!
//! Two families of errors live here:
//!
//! - [`RouteError`]: configuration mistakes detected while routes are being
//!   registered (malformed patterns, conflicting parameters, double mounts).
//!   The registration API turns these into panics so a misconfigured router
//!   never starts serving.
//! - [`ApiError`]: the JSON error body used by the router's default responses
//!   (404, 405) and by the bundled middlewares.

use crate::config::Environment;
use http::StatusCode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for Trellis operations
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// A routing configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("routing pattern must begin with '/' in '{0}'")]
    MissingLeadingSlash(String),

    #[error("route param closing delimiter '}}' is missing in '{0}'")]
    UnclosedParam(String),

    #[error("route param name is empty in '{0}'")]
    EmptyParamName(String),

    #[error("wildcard '*' must be the last value in a route, trim trailing text or use a '{{param}}' instead: '{0}'")]
    WildcardNotLast(String),

    #[error("invalid regexp pattern '{pattern}' in route param: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("routing pattern '{pattern}' contains duplicate param key '{key}'")]
    DuplicateParam { pattern: String, key: String },

    #[error("routing pattern '{pattern}' names its param '{{{new}}}' where an existing route already uses '{{{existing}}}'")]
    ParamConflict {
        pattern: String,
        existing: String,
        new: String,
    },

    #[error("invalid HTTP method '{0}' in routing pattern")]
    InvalidMethod(String),

    #[error("attempting to mount a handler on an existing path, '{0}'")]
    MountConflict(String),

    #[error("all middlewares must be defined before routes on a mux")]
    MiddlewareAfterRoutes,

    #[error("routes cannot be changed once the router has started serving")]
    RouterFrozen,
}

/// Standard API error type
///
/// Rendered as a JSON body of the form
/// `{"error": {"type": "...", "message": "..."}}`.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: StatusCode,
    /// Error type identifier
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    /// Internal details (hidden in production)
    pub(crate) internal: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type: error_type.into(),
            message: message.into(),
            internal: None,
        }
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    /// Create a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// Create a 405 Method Not Allowed error
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", message)
    }

    /// Create a 413 Payload Too Large error
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", message)
    }

    /// Create a 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Create a 504 Gateway Timeout error
    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "gateway_timeout", message)
    }

    /// Add internal details (for logging, hidden from response in prod)
    pub fn with_internal(mut self, details: impl Into<String>) -> Self {
        self.internal = Some(details.into());
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

impl std::error::Error for ApiError {}

/// JSON representation of API error response
#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn new(err: ApiError, env: &Environment) -> Self {
        let details = if env.show_error_details() {
            err.internal
        } else {
            None
        };
        Self {
            error: ErrorBody {
                error_type: err.error_type,
                message: err.message,
                details,
            },
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal("I/O error").with_internal(err.to_string())
    }
}

impl From<hyper::Error> for ApiError {
    fn from(err: hyper::Error) -> Self {
        ApiError::internal("HTTP error").with_internal(err.to_string())
    }
}
