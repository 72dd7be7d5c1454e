//! Liveness endpoint middleware

use crate::chain::Middleware;
use crate::handler::{boxed, BoxHandler};
use crate::request::Request;
use crate::response::IntoResponse;
use futures_util::future::{self, FutureExt};
use http::{header, HeaderValue, Method, StatusCode};
use std::sync::Arc;

/// Answers `GET`/`HEAD` requests to a fixed path with `200 .` before any
/// routing happens, so load balancers can check liveness cheaply.
///
/// ```rust,ignore
/// mux.layer(Heartbeat::new("/ping"));
/// ```
#[derive(Debug, Clone)]
pub struct Heartbeat {
    endpoint: Arc<str>,
}

impl Heartbeat {
    pub fn new(endpoint: impl Into<Arc<str>>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    fn matches(&self, req: &Request) -> bool {
        (req.method() == Method::GET || req.method() == Method::HEAD)
            && req.path().eq_ignore_ascii_case(&self.endpoint)
    }
}

impl Middleware for Heartbeat {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let heartbeat = self.clone();
        boxed(move |req: Request| {
            if heartbeat.matches(&req) {
                let mut response = (StatusCode::OK, ".").into_response();
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                return future::ready(response).boxed();
            }
            next.call(req)
        })
    }
}
