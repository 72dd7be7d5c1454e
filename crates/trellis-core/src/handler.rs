//! Handler trait
//!
//! Everything the router dispatches to is a [`Handler`]: plain async
//! functions, the composite handlers built by middleware chains, and routers
//! themselves (which is what makes mounting work).
//!
//! ```rust,ignore
//! async fn hello(req: Request) -> String {
//!     format!("hello {}", url_param(&req, "name"))
//! }
//!
//! mux.get("/hello/{name}", hello);
//! ```

use crate::mux::Routes;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// A request handler.
pub trait Handler: Send + Sync + 'static {
    /// Handle a request.
    fn call(&self, req: Request) -> BoxFuture<'static, Response>;

    /// The route table of this handler when it is a router.
    ///
    /// Mounting and route walking use this to see through mount points.
    fn as_routes(&self) -> Option<&dyn Routes> {
        None
    }
}

/// Shared, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        let fut = (self)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Erase a handler into a [`BoxHandler`].
pub fn boxed<H: Handler>(handler: H) -> BoxHandler {
    Arc::new(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    async fn created(_req: Request) -> (StatusCode, &'static str) {
        (StatusCode::CREATED, "ok")
    }

    #[tokio::test]
    async fn test_async_fn_is_a_handler() {
        let handler = boxed(created);
        let response = handler.call(Request::get("/")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(handler.as_routes().is_none());
    }

    #[tokio::test]
    async fn test_closure_is_a_handler() {
        let greeting = String::from("hi");
        let handler = boxed(move |_: Request| {
            let greeting = greeting.clone();
            async move { greeting }
        });
        let response = handler.call(Request::get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
