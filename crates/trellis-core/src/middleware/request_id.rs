//! Request ID middleware
//!
//! Tags every request with a [`RequestId`], stored in the request extensions
//! and echoed back in the `X-Request-Id` response header. An id sent by the
//! client is kept when it is a sane header value, otherwise a UUID v4 is
//! generated.

use crate::chain::Middleware;
use crate::handler::{boxed, BoxHandler};
use crate::request::Request;
use futures_util::FutureExt;
use http::header::HeaderName;
use http::HeaderValue;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Default header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_INCOMING_LEN: usize = 128;

/// Identifier of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// A fresh random id.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the request id of `req`, if a [`RequestIdLayer`] ran before.
    pub fn from_request(req: &Request) -> Option<&RequestId> {
        req.extensions().get::<RequestId>()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assigns a [`RequestId`] to each request.
#[derive(Clone)]
pub struct RequestIdLayer {
    header: HeaderName,
    trust_incoming: bool,
}

impl RequestIdLayer {
    pub fn new() -> Self {
        Self {
            header: HeaderName::from_static(REQUEST_ID_HEADER),
            trust_incoming: true,
        }
    }

    /// Use another header name, e.g. `x-correlation-id`.
    pub fn with_header(mut self, header: HeaderName) -> Self {
        self.header = header;
        self
    }

    /// Always generate a fresh id, ignoring the one sent by the client.
    pub fn ignore_incoming(mut self) -> Self {
        self.trust_incoming = false;
        self
    }

    fn incoming(&self, req: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        let value = req.headers().get(&self.header)?.to_str().ok()?;
        if value.is_empty() || value.len() > MAX_INCOMING_LEN {
            return None;
        }
        Some(RequestId::new(value))
    }
}

impl Default for RequestIdLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for RequestIdLayer {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let layer = self.clone();
        boxed(move |mut req: Request| {
            let id = layer.incoming(&req).unwrap_or_else(RequestId::generate);
            req.extensions_mut().insert(id.clone());

            let header = layer.header.clone();
            next.call(req).map(move |mut res| {
                if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                    res.headers_mut().insert(header, value);
                }
                res
            })
        })
    }
}
