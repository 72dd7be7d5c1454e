//! In-process client for exercising a router in tests
//!
//! Requests go through the same body buffering and dispatch path as the
//! real server, without binding a socket.
//!
//! ```rust,ignore
//! let mut mux = Mux::new();
//! mux.get("/hello/{name}", hello);
//!
//! let client = TestClient::new(mux);
//! client
//!     .get("/hello/bob")
//!     .await
//!     .assert_status(StatusCode::OK)
//!     .assert_body_contains("bob");
//! ```

use crate::config::DEFAULT_BODY_LIMIT;
use crate::handler::{BoxHandler, Handler};
use crate::response::Response;
use crate::server::handle_request;
use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Dispatches [`TestRequest`]s to a handler.
#[derive(Clone)]
pub struct TestClient {
    handler: BoxHandler,
    body_limit: usize,
}

impl TestClient {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self::with_body_limit(handler, DEFAULT_BODY_LIMIT)
    }

    pub fn with_body_limit<H: Handler>(handler: H, limit: usize) -> Self {
        Self {
            handler: Arc::new(handler),
            body_limit: limit,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.request(TestRequest::post(path).json(body)).await
    }

    /// Send a fully built request.
    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let mut builder = http::Request::builder().method(req.method).uri(req.path.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(req.headers);
        }
        let body = Full::new(req.body.unwrap_or_default());

        let response = match builder.body(body) {
            Ok(http_req) => {
                let remote = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
                handle_request(&self.handler, http_req, self.body_limit, remote).await
            }
            Err(err) => panic!("invalid test request for '{}': {}", req.path, err),
        };
        TestResponse::from_response(response).await
    }
}

/// Request builder for [`TestClient`].
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl TestRequest {
    /// A request with any method, including extension methods like `PURGE`.
    pub fn method(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::method(Method::GET, path)
    }

    pub fn head(path: &str) -> Self {
        Self::method(Method::HEAD, path)
    }

    pub fn post(path: &str) -> Self {
        Self::method(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::method(Method::PUT, path)
    }

    pub fn patch(path: &str) -> Self {
        Self::method(Method::PATCH, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::method(Method::DELETE, path)
    }

    pub fn options(path: &str) -> Self {
        Self::method(Method::OPTIONS, path)
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (key.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            self.headers.append(name, value);
        }
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(body) {
            self.body = Some(Bytes::from(bytes));
            self.headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A buffered response with assertion helpers.
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = body.collect().await.map(|b| b.to_bytes()).unwrap_or_default();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of header `key` as a string, if present and valid.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as a string, lossy on invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// # Panics
    ///
    /// Panics with the response body when the status differs.
    #[track_caller]
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "unexpected status for response with body: {}",
            self.text()
        );
        self
    }

    #[track_caller]
    pub fn assert_header(&self, key: &str, expected: &str) -> &Self {
        let actual = self.header(key).unwrap_or("");
        assert_eq!(actual, expected, "header '{}' mismatch", key);
        self
    }

    #[track_caller]
    pub fn assert_body(&self, expected: &str) -> &Self {
        assert_eq!(self.text(), expected);
        self
    }

    #[track_caller]
    pub fn assert_body_contains(&self, expected: &str) -> &Self {
        let body = self.text();
        assert!(body.contains(expected), "body '{}' does not contain '{}'", body, expected);
        self
    }
}
