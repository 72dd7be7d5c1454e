//! Request logging middleware
//!
//! Logs request method, path, request_id, status code, and duration for each request.
//! Supports custom fields that are included in all request spans.

use super::request_id::RequestId;
use crate::chain::Middleware;
use crate::handler::{boxed, BoxHandler};
use crate::request::Request;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info_span, Instrument, Level};

/// Middleware that creates a tracing span for each request
///
/// The `http_request` span contains:
/// - HTTP method
/// - Request path
/// - Request ID (if [`RequestIdLayer`](super::RequestIdLayer) runs first)
/// - Response status code
/// - Request duration
/// - Any custom fields configured via `with_field()`
///
/// Installed with `layer` it also sees 404 and 405 responses.
///
/// # Example
///
/// ```rust,ignore
/// mux.layer(RequestIdLayer::new())
///     .layer(Logger::new().with_field("service", "my-api"));
/// ```
#[derive(Clone)]
pub struct Logger {
    level: Level,
    custom_fields: Arc<Vec<(String, String)>>,
}

impl Logger {
    /// Create a new Logger with default INFO level
    pub fn new() -> Self {
        Self::with_level(Level::INFO)
    }

    /// Create a Logger that reports successful requests at `level`
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            custom_fields: Arc::new(Vec::new()),
        }
    }

    /// Add a custom field to all request spans
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.custom_fields).push((key.into(), value.into()));
        self
    }

    fn fields(&self) -> String {
        self.custom_fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! completed {
    ($macro:ident, $method:expr, $path:expr, $request_id:expr, $status:expr, $duration:expr) => {
        tracing::$macro!(
            method = %$method,
            path = %$path,
            request_id = %$request_id,
            status = $status,
            duration_ms = $duration,
            "Request completed"
        )
    };
}

impl Middleware for Logger {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let level = self.level;
        let fields = self.fields();

        boxed(move |req: Request| {
            let method = req.method().to_string();
            let path = req.path().to_string();
            let request_id = RequestId::from_request(&req)
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let span = info_span!(
                "http_request",
                method = %method,
                path = %path,
                request_id = %request_id,
                fields = tracing::field::Empty,
                status = tracing::field::Empty,
                duration_ms = tracing::field::Empty,
                error = tracing::field::Empty,
            );
            if !fields.is_empty() {
                span.record("fields", fields.as_str());
            }

            let fut = next.call(req);
            async move {
                let start = Instant::now();
                let response = fut.instrument(span.clone()).await;

                let duration = start.elapsed().as_millis() as u64;
                let status = response.status();
                let status_code = status.as_u16();

                span.record("status", status_code);
                span.record("duration_ms", duration);

                let _enter = span.enter();
                if status.is_client_error() || status.is_server_error() {
                    span.record("error", true);
                    tracing::warn!(
                        method = %method,
                        path = %path,
                        request_id = %request_id,
                        status = status_code,
                        duration_ms = duration,
                        error = true,
                        "Request failed"
                    );
                } else {
                    match level {
                        Level::TRACE => completed!(trace, method, path, request_id, status_code, duration),
                        Level::DEBUG => completed!(debug, method, path, request_id, status_code, duration),
                        Level::INFO => completed!(info, method, path, request_id, status_code, duration),
                        Level::WARN => completed!(warn, method, path, request_id, status_code, duration),
                        Level::ERROR => completed!(error, method, path, request_id, status_code, duration),
                    }
                }
                response
            }
        })
    }
}
