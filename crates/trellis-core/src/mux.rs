//! The router
//!
//! [`Mux`] owns a radix tree and the middleware stack wrapped around route
//! dispatch. Routes are registered through the [`Router`] trait, which is
//! also implemented by [`InlineRouter`], the scoped router handed out by
//! [`Router::with`] and [`Router::group`].
//!
//! ```rust,ignore
//! let mut mux = Mux::new();
//! mux.layer(RequestIdLayer::new());
//! mux.get("/", index);
//! mux.route("/articles", |r| {
//!     r.get("/", list_articles);
//!     r.with(auth).post("/", create_article);
//!     r.get("/{id}", show_article);
//! });
//! mux.mount("/admin", admin_router());
//! ```
//!
//! Two middleware scopes exist. Middlewares added to a `Mux` with
//! [`Router::layer`] wrap dispatch itself, so they run for every request
//! including 404 and 405 responses, and must all be added before the first
//! route. Middlewares added through `with`/`group` are baked into each
//! endpoint registered in that scope.
//!
//! Configuration mistakes (bad patterns, conflicting params, double mounts,
//! late middlewares) panic with the corresponding [`RouteError`] message.

use crate::chain::{chain, BoxMiddleware, ChainHandler, Middleware};
use crate::context::RouteContext;
use crate::error::{ApiError, RouteError};
use crate::handler::{boxed, BoxHandler, Handler};
use crate::log_macros::{log_debug, log_trace};
use crate::method::{split_method_pattern, MethodFilter};
use crate::pattern::{param_keys, CATCH_ALL_KEY};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::tree::{Node, Route};
use futures_util::future::{self, BoxFuture, FutureExt};
use http::{header, HeaderValue, Method};
use std::fmt;
use std::sync::{Arc, OnceLock};

#[track_caller]
fn fail(err: RouteError) -> ! {
    panic!("trellis: {}", err)
}

/// Read access to a router's route table.
///
/// Implemented by [`Mux`]; reachable from any mounted handler through
/// [`Handler::as_routes`].
pub trait Routes: Send + Sync {
    /// Introspection records of the routes registered on this router.
    fn routes(&self) -> Vec<Route>;

    /// Middlewares wrapped around this router's dispatch.
    fn middlewares(&self) -> &[BoxMiddleware];

    /// Whether a handler exists for `method` and `path`, following mounts.
    fn match_route(&self, ctx: &mut RouteContext, method: &Method, path: &str) -> bool;

    /// The full pattern that would serve `method` and `path`, following
    /// mounts.
    fn find_pattern(&self, ctx: &mut RouteContext, method: &Method, path: &str) -> Option<String>;
}

/// An HTTP request router.
pub struct Mux {
    tree: Arc<Node>,
    middlewares: Vec<BoxMiddleware>,
    not_found: Option<BoxHandler>,
    method_not_allowed: Option<BoxHandler>,
    /// Middlewares wrapped around route dispatch, built on first request.
    handler: OnceLock<BoxHandler>,
    /// Set once routes or scoped routers exist; no more layers after that.
    sealed: bool,
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

impl Mux {
    pub fn new() -> Self {
        Self {
            tree: Arc::new(Node::default()),
            middlewares: Vec::new(),
            not_found: None,
            method_not_allowed: None,
            handler: OnceLock::new(),
            sealed: false,
        }
    }

    fn assert_not_serving(&self) {
        if self.handler.get().is_some() {
            fail(RouteError::RouterFrozen);
        }
    }

    fn tree_mut(&mut self) -> &mut Node {
        self.assert_not_serving();
        match Arc::get_mut(&mut self.tree) {
            Some(tree) => tree,
            None => fail(RouteError::RouterFrozen),
        }
    }

    fn insert(
        &mut self,
        middlewares: &[BoxMiddleware],
        filter: MethodFilter,
        pattern: &str,
        endpoint: BoxHandler,
    ) -> &mut Node {
        if !pattern.starts_with('/') {
            fail(RouteError::MissingLeadingSlash(pattern.to_string()));
        }
        if let Err(err) = param_keys(pattern) {
            fail(err);
        }

        log_debug!(pattern, method = ?filter, "route registered");

        self.sealed = true;
        let handler = Arc::new(ChainHandler::new(middlewares.to_vec(), endpoint));
        match self.tree_mut().insert_route(&filter, pattern, handler) {
            Ok(node) => node,
            Err(err) => fail(err),
        }
    }

    fn mount_handler(&mut self, middlewares: &[BoxMiddleware], pattern: &str, handler: BoxHandler) {
        if self.tree.find_pattern(&format!("{}*", pattern))
            || self.tree.find_pattern(&format!("{}/*", pattern))
        {
            fail(RouteError::MountConflict(pattern.to_string()));
        }

        log_debug!(pattern, router = handler.as_routes().is_some(), "handler mounted");

        let subroutes = handler.as_routes().is_some().then(|| handler.clone());
        let mounted: BoxHandler = Arc::new(Mounted { inner: handler });

        let mut prefix = pattern.to_string();
        if !prefix.ends_with('/') {
            self.insert(middlewares, MethodFilter::Any, &prefix, mounted.clone())
                .mark_mount(None);
            prefix.push('/');
            self.insert(middlewares, MethodFilter::Any, &prefix, mounted.clone())
                .mark_mount(None);
        }

        prefix.push('*');
        let node = self.insert(middlewares, MethodFilter::Any, &prefix, mounted);
        if subroutes.is_some() {
            node.mark_mount(subroutes);
        }
    }

    /// The dispatch handler wrapped in this mux's middlewares.
    fn composite(&self) -> &BoxHandler {
        self.handler.get_or_init(|| {
            let dispatch = Arc::new(RouteDispatch {
                tree: self.tree.clone(),
                not_found: self.not_found.clone(),
                method_not_allowed: self.method_not_allowed.clone(),
            });
            chain(&self.middlewares, dispatch)
        })
    }
}

impl Handler for Mux {
    fn call(&self, mut req: Request) -> BoxFuture<'static, Response> {
        if !req.route.dispatched {
            req.route.reset();
            req.route.dispatched = true;
        }
        self.composite().call(req)
    }

    fn as_routes(&self) -> Option<&dyn Routes> {
        Some(self)
    }
}

impl Routes for Mux {
    fn routes(&self) -> Vec<Route> {
        self.tree.routes()
    }

    fn middlewares(&self) -> &[BoxMiddleware] {
        &self.middlewares
    }

    fn match_route(&self, ctx: &mut RouteContext, method: &Method, path: &str) -> bool {
        let Some(node) = self.tree.find_route(ctx, method, path) else {
            return false;
        };
        match node.subroutes().and_then(|h| h.as_routes()) {
            Some(sub) => {
                let next = ctx.next_route_path();
                ctx.set_route_path(next.clone());
                sub.match_route(ctx, method, &next)
            }
            None => node.endpoint(method).is_some(),
        }
    }

    fn find_pattern(&self, ctx: &mut RouteContext, method: &Method, path: &str) -> Option<String> {
        let node = self.tree.find_route(ctx, method, path)?;
        let pattern = node.endpoint(method)?.pattern.to_string();
        match node.subroutes().and_then(|h| h.as_routes()) {
            Some(sub) => {
                let next = ctx.next_route_path();
                ctx.set_route_path(next.clone());
                let sub_pattern = sub.find_pattern(ctx, method, &next)?;
                let prefix = pattern.strip_suffix("/*").unwrap_or(&pattern);
                Some(format!("{}{}", prefix, sub_pattern))
            }
            None => Some(pattern),
        }
    }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mux")
            .field("tree", &self.tree)
            .field("middlewares", &self.middlewares.len())
            .field("not_found", &self.not_found.is_some())
            .field("method_not_allowed", &self.method_not_allowed.is_some())
            .finish()
    }
}

/// Route registration, shared by [`Mux`] and [`InlineRouter`].
pub trait Router {
    /// The mux routes are registered on and the scoped middlewares baked
    /// into each endpoint.
    #[doc(hidden)]
    fn parts(&mut self) -> (&mut Mux, &[BoxMiddleware]);

    /// Append a middleware to this router's stack.
    ///
    /// # Panics
    ///
    /// On a [`Mux`], when called after a route has been registered.
    fn layer<M: Middleware>(&mut self, middleware: M) -> &mut Self;

    /// A scoped router that adds `middleware` to every route registered
    /// through it.
    fn with<M: Middleware>(&mut self, middleware: M) -> InlineRouter<'_> {
        let (mux, middlewares) = self.parts();
        let mut scoped = middlewares.to_vec();
        scoped.push(Arc::new(middleware));
        mux.sealed = true;
        InlineRouter {
            mux,
            middlewares: scoped,
        }
    }

    /// Register routes in a scope whose middlewares do not leak out of it.
    fn group<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut InlineRouter<'_>),
    {
        {
            let (mux, middlewares) = self.parts();
            let middlewares = middlewares.to_vec();
            mux.sealed = true;
            let mut scoped = InlineRouter { mux, middlewares };
            f(&mut scoped);
        }
        self
    }

    /// Build a fresh sub-router with `f` and mount it at `pattern`.
    ///
    /// Returns this router so registrations can keep chaining. The
    /// sub-router is only reachable inside `f`; it is moved into the mount
    /// once `f` returns.
    fn route<F>(&mut self, pattern: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut Mux),
    {
        let mut sub = Mux::new();
        f(&mut sub);
        self.mount(pattern, sub)
    }

    /// Attach `handler` at `pattern`, forwarding every path below it.
    ///
    /// The handler sees the unmatched remainder as its route path, the
    /// request URI is left untouched. A mounted [`Mux`] without its own
    /// not-found or method-not-allowed handler uses this router's.
    ///
    /// # Panics
    ///
    /// When something is already mounted at `pattern`.
    fn mount<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        let (mux, middlewares) = self.parts();
        let middlewares = middlewares.to_vec();
        mux.mount_handler(&middlewares, pattern, boxed(handler));
        self
    }

    /// Register `handler` for every method, or for one method when the
    /// pattern reads `"METHOD /path"`.
    fn handle<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        let (filter, path) = match split_method_pattern(pattern) {
            Ok(split) => split,
            Err(err) => fail(err),
        };
        let (mux, middlewares) = self.parts();
        let middlewares = middlewares.to_vec();
        mux.insert(&middlewares, filter, path, boxed(handler));
        self
    }

    /// Register `handler` for `method`, which may be an extension method.
    fn method<H: Handler>(&mut self, method: Method, pattern: &str, handler: H) -> &mut Self {
        let (mux, middlewares) = self.parts();
        let middlewares = middlewares.to_vec();
        mux.insert(&middlewares, MethodFilter::One(method), pattern, boxed(handler));
        self
    }

    fn connect<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.method(Method::CONNECT, pattern, handler)
    }

    fn delete<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.method(Method::DELETE, pattern, handler)
    }

    fn get<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.method(Method::GET, pattern, handler)
    }

    fn head<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.method(Method::HEAD, pattern, handler)
    }

    fn options<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.method(Method::OPTIONS, pattern, handler)
    }

    fn patch<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.method(Method::PATCH, pattern, handler)
    }

    fn post<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.method(Method::POST, pattern, handler)
    }

    fn put<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.method(Method::PUT, pattern, handler)
    }

    fn trace<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.method(Method::TRACE, pattern, handler)
    }

    /// Handler for requests no route matches.
    fn not_found<H: Handler>(&mut self, handler: H) -> &mut Self {
        let (mux, middlewares) = self.parts();
        mux.assert_not_serving();
        mux.not_found = Some(scoped_handler(middlewares, handler));
        self
    }

    /// Handler for paths that exist under other methods only.
    ///
    /// The `Allow` header is added to its response when missing.
    fn method_not_allowed<H: Handler>(&mut self, handler: H) -> &mut Self {
        let (mux, middlewares) = self.parts();
        mux.assert_not_serving();
        mux.method_not_allowed = Some(scoped_handler(middlewares, handler));
        self
    }
}

fn scoped_handler<H: Handler>(middlewares: &[BoxMiddleware], handler: H) -> BoxHandler {
    if middlewares.is_empty() {
        boxed(handler)
    } else {
        Arc::new(ChainHandler::new(middlewares.to_vec(), boxed(handler)))
    }
}

impl Router for Mux {
    fn parts(&mut self) -> (&mut Mux, &[BoxMiddleware]) {
        (self, &[])
    }

    fn layer<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        if self.sealed || self.handler.get().is_some() {
            fail(RouteError::MiddlewareAfterRoutes);
        }
        self.middlewares.push(Arc::new(middleware));
        self
    }
}

/// A scoped view of a [`Mux`] carrying extra middlewares.
///
/// Routes registered here land in the parent's tree with the scope's
/// middlewares wrapped around their handlers.
pub struct InlineRouter<'a> {
    mux: &'a mut Mux,
    middlewares: Vec<BoxMiddleware>,
}

impl InlineRouter<'_> {
    pub fn middlewares(&self) -> &[BoxMiddleware] {
        &self.middlewares
    }
}

impl Router for InlineRouter<'_> {
    fn parts(&mut self) -> (&mut Mux, &[BoxMiddleware]) {
        (&mut *self.mux, &self.middlewares)
    }

    fn layer<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }
}

/// Resolves a request against the tree and calls the matched endpoint.
struct RouteDispatch {
    tree: Arc<Node>,
    not_found: Option<BoxHandler>,
    method_not_allowed: Option<BoxHandler>,
}

impl Handler for RouteDispatch {
    fn call(&self, mut req: Request) -> BoxFuture<'static, Response> {
        let Request { parts, route, .. } = &mut req;

        let method = route
            .route_method
            .clone()
            .unwrap_or_else(|| parts.method.clone());

        let override_path = route.route_path.take();
        let path = match override_path.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => parts.uri.path(),
        };
        let path = if path.is_empty() { "/" } else { path };

        let found = self
            .tree
            .find_route(route, &method, path)
            .and_then(|node| node.endpoint(&method))
            .map(|endpoint| endpoint.handler.clone());

        if found.is_none() {
            log_trace!(%method, path, method_not_allowed = route.method_not_allowed, "no route matched");
        }
        let message_path = found.is_none().then(|| path.to_string());
        route.route_path = override_path;

        if let Some(handler) = found {
            if self.not_found.is_some() {
                route.fallbacks.not_found = self.not_found.clone();
            }
            if self.method_not_allowed.is_some() {
                route.fallbacks.method_not_allowed = self.method_not_allowed.clone();
            }
            return handler.call(req);
        }

        let path = message_path.unwrap_or_default();

        if route.method_not_allowed {
            let allow = allow_header(&route.methods_allowed);
            let custom = self
                .method_not_allowed
                .clone()
                .or_else(|| route.fallbacks.method_not_allowed.clone());
            return match custom {
                Some(handler) => handler
                    .call(req)
                    .map(move |mut res| {
                        if let Some(allow) = allow {
                            res.headers_mut().entry(header::ALLOW).or_insert(allow);
                        }
                        res
                    })
                    .boxed(),
                None => {
                    let mut res = ApiError::method_not_allowed(format!(
                        "Method {} not allowed for {}",
                        method, path
                    ))
                    .into_response();
                    if let Some(allow) = allow {
                        res.headers_mut().insert(header::ALLOW, allow);
                    }
                    future::ready(res).boxed()
                }
            };
        }

        let custom = self
            .not_found
            .clone()
            .or_else(|| route.fallbacks.not_found.clone());
        match custom {
            Some(handler) => handler.call(req),
            None => future::ready(
                ApiError::not_found(format!("No route found for {} {}", method, path)).into_response(),
            )
            .boxed(),
        }
    }
}

fn allow_header(methods: &[Method]) -> Option<HeaderValue> {
    if methods.is_empty() {
        return None;
    }
    let joined = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&joined).ok()
}

/// Hands the unmatched remainder of the path to a mounted handler.
struct Mounted {
    inner: BoxHandler,
}

impl Handler for Mounted {
    fn call(&self, mut req: Request) -> BoxFuture<'static, Response> {
        let next = req.route.next_route_path();
        req.route.set_route_path(next);
        req.route.url_params.blank_last(CATCH_ALL_KEY);
        self.inner.call(req)
    }

    fn as_routes(&self) -> Option<&dyn Routes> {
        self.inner.as_routes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::url_param;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use std::sync::Mutex;

    async fn send(mux: &Mux, method: Method, path: &str) -> (StatusCode, String) {
        let response = mux.call(Request::with_method(method, path)).await;
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn get(mux: &Mux, path: &str) -> (StatusCode, String) {
        send(mux, Method::GET, path).await
    }

    fn text(body: &'static str) -> impl Handler {
        move |_: Request| async move { body }
    }

    fn marker(name: &'static str) -> impl Middleware {
        move |next: BoxHandler| -> BoxHandler {
            boxed(move |mut req: Request| {
                let next = next.clone();
                async move {
                    req.headers_mut()
                        .append("x-trail", HeaderValue::from_static(name));
                    let mut res = next.call(req).await;
                    res.headers_mut()
                        .append("x-seen", HeaderValue::from_static(name));
                    res
                }
            })
        }
    }

    async fn trail(req: Request) -> String {
        req.headers()
            .get_all("x-trail")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",")
    }

    #[tokio::test]
    async fn test_basic_routing() {
        let mut mux = Mux::new();
        mux.get("/", text("index"));
        mux.get("/hello/{name}", |req: Request| async move {
            format!("hello {}", url_param(&req, "name"))
        });
        mux.post("/hello/{name}", text("posted"));

        assert_eq!(get(&mux, "/").await, (StatusCode::OK, "index".into()));
        assert_eq!(get(&mux, "/hello/bob").await, (StatusCode::OK, "hello bob".into()));
        assert_eq!(
            send(&mux, Method::POST, "/hello/bob").await,
            (StatusCode::OK, "posted".into())
        );
    }

    #[tokio::test]
    async fn test_not_found_and_method_not_allowed() {
        let mut mux = Mux::new();
        mux.get("/users/{id}", text("user"));
        mux.put("/users/{id}", text("put"));

        let response = mux.call(Request::with_method(Method::DELETE, "/users/1")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET, PUT");

        let (status, body) = get(&mux, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("No route found for GET /nope"));
    }

    #[tokio::test]
    async fn test_custom_fallbacks() {
        let mut mux = Mux::new();
        mux.get("/only-get", text("ok"));
        mux.not_found(|_: Request| async { (StatusCode::NOT_FOUND, "custom 404") });
        mux.method_not_allowed(|_: Request| async { (StatusCode::METHOD_NOT_ALLOWED, "custom 405") });

        assert_eq!(get(&mux, "/missing").await, (StatusCode::NOT_FOUND, "custom 404".into()));

        let response = mux.call(Request::with_method(Method::POST, "/only-get")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET");
    }

    #[tokio::test]
    async fn test_any_method_and_method_pattern() {
        let mut mux = Mux::new();
        mux.handle("/any", text("any"));
        mux.handle("PURGE /cache", text("purged"));
        mux.handle("GET /cache", text("cached"));

        let purge = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(send(&mux, Method::PATCH, "/any").await.1, "any");
        assert_eq!(send(&mux, purge.clone(), "/any").await.1, "any");
        assert_eq!(send(&mux, purge, "/cache").await.1, "purged");
        assert_eq!(get(&mux, "/cache").await.1, "cached");
        assert_eq!(
            send(&mux, Method::POST, "/cache").await.0,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[tokio::test]
    async fn test_mux_middlewares_wrap_dispatch() {
        let mut mux = Mux::new();
        mux.layer(marker("a")).layer(marker("b"));
        mux.get("/", trail);

        let response = mux.call(Request::get("/")).await;
        let seen: Vec<_> = response
            .headers()
            .get_all("x-seen")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(seen, vec!["b", "a"]);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from("a,b"));

        // Also on misses.
        let response = mux.call(Request::get("/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get_all("x-seen").iter().count(), 2);
    }

    #[tokio::test]
    async fn test_with_and_group_scope_middlewares() {
        let mut mux = Mux::new();
        mux.get("/plain", trail);
        mux.with(marker("w")).get("/with", trail);
        mux.group(|g| {
            g.layer(marker("g"));
            g.get("/group", trail);
            g.with(marker("gw")).get("/group/with", trail);
        });
        mux.get("/after", trail);

        assert_eq!(get(&mux, "/plain").await.1, "");
        assert_eq!(get(&mux, "/with").await.1, "w");
        assert_eq!(get(&mux, "/group").await.1, "g");
        assert_eq!(get(&mux, "/group/with").await.1, "g,gw");
        assert_eq!(get(&mux, "/after").await.1, "");
    }

    #[tokio::test]
    async fn test_mount_forwards_remainder() {
        let mut api = Mux::new();
        api.get("/status", |req: Request| async move {
            format!(
                "{} {} {}",
                req.route().route_path().unwrap_or_default(),
                req.path(),
                req.route().route_pattern()
            )
        });
        api.get("/", text("api root"));

        let mut mux = Mux::new();
        mux.mount("/v1", api);

        assert_eq!(
            get(&mux, "/v1/status").await,
            (StatusCode::OK, "/status /v1/status /v1/status".into())
        );
        assert_eq!(get(&mux, "/v1").await.1, "api root");
        assert_eq!(get(&mux, "/v1/").await.1, "api root");
    }

    #[tokio::test]
    async fn test_route_builds_sub_router_with_params() {
        let mut mux = Mux::new();
        mux.route("/users/{user_id}", |r| {
            r.get("/", |req: Request| async move {
                format!("user {}", url_param(&req, "user_id"))
            });
            r.get("/posts/{id}", |req: Request| async move {
                format!(
                    "user {} post {} *={:?}",
                    url_param(&req, "user_id"),
                    url_param(&req, "id"),
                    req.url_param("*")
                )
            });
        });

        assert_eq!(get(&mux, "/users/7").await.1, "user 7");
        assert_eq!(get(&mux, "/users/7/posts/9").await.1, "user 7 post 9 *=Some(\"\")");
    }

    #[tokio::test]
    async fn test_mounted_mux_inherits_fallbacks() {
        let mut sub = Mux::new();
        sub.get("/here", text("here"));

        let mut mux = Mux::new();
        mux.not_found(text("parent 404"));
        mux.method_not_allowed(|_: Request| async { (StatusCode::METHOD_NOT_ALLOWED, "parent 405") });
        mux.mount("/sub", sub);

        assert_eq!(get(&mux, "/sub/missing").await.1, "parent 404");
        let response = mux.call(Request::with_method(Method::POST, "/sub/here")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET");
    }

    #[tokio::test]
    async fn test_route_method_override() {
        let mut mux = Mux::new();
        mux.layer(|next: BoxHandler| -> BoxHandler {
            boxed(move |mut req: Request| {
                req.route_mut().set_route_method(Method::DELETE);
                next.call(req)
            })
        });
        mux.delete("/thing", text("deleted"));

        assert_eq!(get(&mux, "/thing").await.1, "deleted");
    }

    #[tokio::test]
    async fn test_reregistering_overwrites() {
        let mut mux = Mux::new();
        mux.get("/x", text("first"));
        mux.get("/x", text("second"));
        assert_eq!(get(&mux, "/x").await.1, "second");
    }

    #[tokio::test]
    async fn test_match_and_find_pattern() {
        let mut admin = Mux::new();
        admin.get("/users/{id}", text("user"));
        let mut mux = Mux::new();
        mux.get("/", text("index"));
        mux.mount("/admin", admin);

        let mut ctx = RouteContext::new();
        assert!(mux.match_route(&mut ctx, &Method::GET, "/admin/users/1"));
        let mut ctx = RouteContext::new();
        assert!(!mux.match_route(&mut ctx, &Method::POST, "/admin/users/1"));

        let mut ctx = RouteContext::new();
        assert_eq!(
            mux.find_pattern(&mut ctx, &Method::GET, "/admin/users/1").as_deref(),
            Some("/admin/users/{id}")
        );
        let mut ctx = RouteContext::new();
        assert_eq!(mux.find_pattern(&mut ctx, &Method::GET, "/admin/nope"), None);
    }

    #[tokio::test]
    async fn test_mux_is_shared_across_tasks() {
        let mut mux = Mux::new();
        mux.get("/items/{id}", |req: Request| async move {
            tokio::task::yield_now().await;
            url_param(&req, "id").to_string()
        });
        let mux = Arc::new(mux);
        let results = Arc::new(Mutex::new(Vec::new()));

        let mut tasks = Vec::new();
        for i in 0..64 {
            let mux = mux.clone();
            let results = results.clone();
            tasks.push(tokio::spawn(async move {
                let path = format!("/items/{}", i);
                let (_, body) = get(&mux, &path).await;
                results.lock().unwrap().push((i.to_string(), body));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let results = results.lock().unwrap();
        assert_eq!(results.len(), 64);
        assert!(results.iter().all(|(want, got)| want == got));
    }

    #[test]
    #[should_panic(expected = "all middlewares must be defined before routes")]
    fn test_layer_after_route_panics() {
        let mut mux = Mux::new();
        mux.get("/", text("x"));
        mux.layer(marker("late"));
    }

    #[test]
    #[should_panic(expected = "routing pattern must begin with '/'")]
    fn test_missing_slash_panics() {
        Mux::new().get("users", text("x"));
    }

    #[test]
    #[should_panic(expected = "attempting to mount a handler on an existing path, '/api'")]
    fn test_double_mount_panics() {
        let mut mux = Mux::new();
        mux.mount("/api", Mux::new());
        mux.mount("/api", Mux::new());
    }

    #[test]
    #[should_panic(expected = "duplicate param key 'id'")]
    fn test_duplicate_param_panics() {
        Mux::new().get("/{id}/{id}", text("x"));
    }

    #[tokio::test]
    #[should_panic(expected = "routes cannot be changed once the router has started serving")]
    async fn test_registration_after_serving_panics() {
        let mut mux = Mux::new();
        mux.get("/", text("x"));
        let _ = mux.call(Request::get("/")).await;
        mux.get("/late", text("y"));
    }

    #[tokio::test]
    #[should_panic(expected = "routes cannot be changed once the router has started serving")]
    async fn test_not_found_after_serving_panics() {
        let mut mux = Mux::new();
        mux.get("/", text("x"));
        let _ = mux.call(Request::get("/")).await;
        mux.not_found(|_: Request| async { (StatusCode::IM_A_TEAPOT, "late") });
    }

    #[tokio::test]
    #[should_panic(expected = "routes cannot be changed once the router has started serving")]
    async fn test_method_not_allowed_after_serving_panics() {
        let mut mux = Mux::new();
        mux.get("/", text("x"));
        let _ = mux.call(Request::get("/")).await;
        mux.method_not_allowed(|_: Request| async { (StatusCode::IM_A_TEAPOT, "late") });
    }

    #[tokio::test]
    async fn test_inline_fallbacks_before_serving() {
        let mut mux = Mux::new();
        mux.get("/", text("x"));
        mux.group(|r| {
            r.not_found(|_: Request| async { (StatusCode::IM_A_TEAPOT, "group 404") });
        });
        let response = mux.call(Request::get("/missing")).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_route_returns_parent_for_chaining() {
        let mut mux = Mux::new();
        mux.route("/admin", |r| {
            r.get("/", text("admin"));
        })
        .get("/home", text("home"));

        assert_eq!(get(&mux, "/admin/").await, (StatusCode::OK, "admin".to_string()));
        assert_eq!(get(&mux, "/home").await, (StatusCode::OK, "home".to_string()));
        assert_eq!(get(&mux, "/admin/home").await.0, StatusCode::NOT_FOUND);
    }
}
