//! Request timeout middleware

use crate::chain::Middleware;
use crate::error::ApiError;
use crate::handler::{boxed, BoxHandler};
use crate::log_macros::log_warn;
use crate::request::Request;
use crate::response::IntoResponse;
use std::time::Duration;

/// Cancels handlers that run longer than a deadline and answers
/// `504 Gateway Timeout`.
///
/// The handler future is dropped when the deadline passes, so work it was
/// awaiting is cancelled at its next await point.
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Middleware for Timeout {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let duration = self.duration;
        boxed(move |req: Request| {
            let path = req.path().to_string();
            let fut = next.call(req);
            async move {
                match tokio::time::timeout(duration, fut).await {
                    Ok(response) => response,
                    Err(_) => {
                        log_warn!(path = %path, timeout_ms = duration.as_millis() as u64, "Request timed out");
                        ApiError::gateway_timeout(format!(
                            "Request did not complete within {} ms",
                            duration.as_millis()
                        ))
                        .into_response()
                    }
                }
            }
        })
    }
}
