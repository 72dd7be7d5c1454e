//! Body size limit middleware
//!
//! The server already refuses to buffer more than `ServerConfig::body_limit`
//! bytes. This middleware enforces a tighter limit on selected routes:
//!
//! ```rust,ignore
//! mux.with(BodyLimit::new(64 * 1024)).post("/avatar", upload_avatar);
//! ```

use crate::chain::Middleware;
use crate::config::DEFAULT_BODY_LIMIT;
use crate::error::ApiError;
use crate::handler::{boxed, BoxHandler};
use crate::request::Request;
use crate::response::IntoResponse;
use futures_util::future::{self, FutureExt};
use http::header::CONTENT_LENGTH;

/// Rejects requests whose body exceeds a limit with `413 Payload Too Large`.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit {
    limit: usize,
}

impl BodyLimit {
    /// Create a body limit middleware with the limit in bytes
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn exceeded(&self, req: &Request) -> bool {
        let declared = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > self.limit) {
            return true;
        }

        // Chunked bodies carry no Content-Length
        req.body().is_some_and(|body| body.len() > self.limit)
    }
}

impl Default for BodyLimit {
    fn default() -> Self {
        Self::new(DEFAULT_BODY_LIMIT)
    }
}

impl Middleware for BodyLimit {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let layer = *self;
        boxed(move |req: Request| {
            if layer.exceeded(&req) {
                let message = format!("Request body exceeds limit of {} bytes", layer.limit);
                return future::ready(ApiError::payload_too_large(message).into_response()).boxed();
            }
            next.call(req)
        })
    }
}
