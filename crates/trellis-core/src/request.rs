//! Request type

use crate::context::RouteContext;
use bytes::Bytes;
use http::{request::Parts, Extensions, HeaderMap, Method, Uri, Version};

/// HTTP request as seen by handlers and middlewares.
///
/// Wraps the `http` request head, the buffered body and the routing context
/// of the request.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: Option<Bytes>,
    pub(crate) route: RouteContext,
}

impl Request {
    /// Create a request from its head and body.
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            parts,
            body: Some(body),
            route: RouteContext::new(),
        }
    }

    /// Create a bodyless request.
    pub fn new(method: Method, uri: Uri) -> Self {
        let mut req = http::Request::new(Bytes::new());
        *req.method_mut() = method;
        *req.uri_mut() = uri;
        req.into()
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn version(&self) -> Version {
        self.parts.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    /// Get request extensions
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Get mutable extensions
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// The original request path, unaffected by mount points.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Body bytes, if not taken yet.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Take the body bytes (can only be called once)
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Routing state of this request.
    pub fn route(&self) -> &RouteContext {
        &self.route
    }

    pub fn route_mut(&mut self) -> &mut RouteContext {
        &mut self.route
    }

    /// A URL parameter of the matched route.
    pub fn url_param(&self, key: &str) -> Option<&str> {
        self.route.url_param(key)
    }

    /// Convert back into an `http::Request`, dropping the routing state.
    pub fn into_http(self) -> http::Request<Bytes> {
        http::Request::from_parts(self.parts, self.body.unwrap_or_default())
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}

/// Value of a URL parameter, or `""` when the route did not bind it.
///
/// ```rust,ignore
/// async fn show(req: Request) -> String {
///     format!("user {}", url_param(&req, "id"))
/// }
/// ```
pub fn url_param<'a>(req: &'a Request, key: &str) -> &'a str {
    req.route.url_param(key).unwrap_or_default()
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.parts.version)
            .field("route", &self.route)
            .finish()
    }
}

#[cfg(test)]
impl Request {
    pub(crate) fn get(path: &str) -> Self {
        Self::with_method(Method::GET, path)
    }

    pub(crate) fn with_method(method: Method, path: &str) -> Self {
        Self::new(method, path.parse().unwrap())
    }
}
