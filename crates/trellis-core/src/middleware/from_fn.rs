//! Middlewares written as async functions
//!
//! ```rust,ignore
//! async fn require_token(req: Request, next: Next) -> Response {
//!     if req.headers().contains_key("x-token") {
//!         next.run(req).await
//!     } else {
//!         StatusCode::UNAUTHORIZED.into_response()
//!     }
//! }
//!
//! mux.with(from_fn(require_token)).post("/admin", admin);
//! ```

use crate::chain::Middleware;
use crate::handler::{BoxHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// The rest of the chain, as seen by a [`from_fn`] middleware.
#[derive(Clone)]
pub struct Next {
    inner: BoxHandler,
}

impl Next {
    /// Run the remaining middlewares and the endpoint.
    pub async fn run(self, req: Request) -> Response {
        self.inner.call(req).await
    }
}

/// Middleware built from an async function by [`from_fn`].
pub struct FromFn<F> {
    f: Arc<F>,
}

impl<F> Clone for FromFn<F> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

/// Create a middleware from an `async fn(Request, Next) -> impl IntoResponse`.
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    FromFn { f: Arc::new(f) }
}

struct FromFnHandler<F> {
    f: Arc<F>,
    next: BoxHandler,
}

impl<F, Fut, R> Handler for FromFnHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        let next = Next {
            inner: self.next.clone(),
        };
        (self.f)(req, next).map(IntoResponse::into_response).boxed()
    }
}

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(FromFnHandler {
            f: self.f.clone(),
            next,
        })
    }
}
