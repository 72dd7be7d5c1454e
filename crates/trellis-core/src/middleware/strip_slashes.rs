//! Trailing slash handling
//!
//! Both middlewares must be installed with `layer` so they run before the
//! router resolves the path.

use crate::chain::Middleware;
use crate::handler::{boxed, BoxHandler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use futures_util::future::{self, FutureExt};
use http::{header, HeaderValue, StatusCode};

/// The path the router will match: the routing override when set, the URI
/// path otherwise.
fn routing_path(req: &Request) -> &str {
    match req.route().route_path() {
        Some(path) if !path.is_empty() => path,
        _ => req.path(),
    }
}

/// Routes `/users/` as `/users`.
///
/// Only the routing path changes; the request URI is left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripSlashes;

impl StripSlashes {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for StripSlashes {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        boxed(move |mut req: Request| {
            let path = routing_path(&req);
            if path.len() > 1 && path.ends_with('/') {
                let stripped = path[..path.len() - 1].to_string();
                req.route_mut().set_route_path(stripped);
            }
            next.call(req)
        })
    }
}

/// Redirects `/users/` to `/users` with `301 Moved Permanently`.
///
/// The query string is preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedirectSlashes;

impl RedirectSlashes {
    pub fn new() -> Self {
        Self
    }
}

fn redirect(location: &str) -> Response {
    let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

impl Middleware for RedirectSlashes {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        boxed(move |req: Request| {
            let path = routing_path(&req);
            if path.len() > 1 && path.ends_with('/') {
                // "//evil.com/" must not become a protocol-relative location
                let mut location = format!("/{}", path.trim_matches('/'));
                if let Some(query) = req.query_string() {
                    location.push('?');
                    location.push_str(query);
                }
                return future::ready(redirect(&location)).boxed();
            }
            next.call(req)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::{Mux, Router};
    use crate::handler::Handler;
    use std::sync::Arc;

    fn mux_with<M: Middleware>(middleware: M) -> Arc<Mux> {
        let mut mux = Mux::new();
        mux.layer(middleware);
        mux.get("/", |_: Request| async { "root" });
        mux.get("/users", |_: Request| async { "users" });
        mux.route("/accounts", |r| {
            r.get("/{id}", |_: Request| async { "account" });
        });
        Arc::new(mux)
    }

    #[tokio::test]
    async fn test_strip_slashes_routes_without_trailing_slash() {
        let mux = mux_with(StripSlashes::new());

        let response = mux.call(Request::get("/users/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = mux.call(Request::get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = mux.call(Request::get("/accounts/7/")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_redirect_slashes() {
        let mux = mux_with(RedirectSlashes::new());

        let response = mux.call(Request::get("/users/?page=2")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/users?page=2");

        let response = mux.call(Request::get("//evil.com/")).await;
        assert_eq!(response.headers()[header::LOCATION], "/evil.com");

        let response = mux.call(Request::get("/users")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
