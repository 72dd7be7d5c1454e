//! Middleware chaining
//!
//! A middleware takes the next handler and returns a new handler wrapping it.
//! Chaining `[m0, m1, m2]` around an endpoint produces `m0(m1(m2(endpoint)))`,
//! so the first middleware registered is the outermost: it sees the request
//! first and the response last.
//!
//! ```text
//! request ──► m0 ──► m1 ──► m2 ──► endpoint
//! response ◄── m0 ◄── m1 ◄── m2 ◄──┘
//! ```

use crate::handler::{BoxHandler, Handler};
use crate::request::Request;
use crate::response::Response;
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Wraps a handler into another handler.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxHandler) -> BoxHandler;
}

/// Shared, type-erased middleware.
pub type BoxMiddleware = Arc<dyn Middleware>;

impl<F> Middleware for F
where
    F: Fn(BoxHandler) -> BoxHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        (self)(next)
    }
}

/// Compose `middlewares` around `endpoint`, first middleware outermost.
pub fn chain(middlewares: &[BoxMiddleware], endpoint: BoxHandler) -> BoxHandler {
    middlewares
        .iter()
        .rev()
        .fold(endpoint, |next, mw| mw.wrap(next))
}

/// An ordered list of middlewares that can be applied to endpoints.
#[derive(Clone, Default)]
pub struct Chain {
    middlewares: Vec<BoxMiddleware>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; it runs after every middleware already added.
    pub fn push<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn middlewares(&self) -> &[BoxMiddleware] {
        &self.middlewares
    }

    /// Wrap `endpoint` with this chain.
    pub fn handler<H: Handler>(&self, endpoint: H) -> ChainHandler {
        ChainHandler::new(self.middlewares.clone(), Arc::new(endpoint))
    }
}

impl From<Vec<BoxMiddleware>> for Chain {
    fn from(middlewares: Vec<BoxMiddleware>) -> Self {
        Self { middlewares }
    }
}

/// An endpoint together with the middlewares wrapped around it.
///
/// Dispatch calls the precomposed handler. The endpoint and the middleware
/// list are kept for route walking.
pub struct ChainHandler {
    endpoint: BoxHandler,
    chained: BoxHandler,
    middlewares: Vec<BoxMiddleware>,
}

impl ChainHandler {
    pub fn new(middlewares: Vec<BoxMiddleware>, endpoint: BoxHandler) -> Self {
        let chained = chain(&middlewares, endpoint.clone());
        Self {
            endpoint,
            chained,
            middlewares,
        }
    }

    /// The handler without its middlewares.
    pub fn endpoint(&self) -> &BoxHandler {
        &self.endpoint
    }

    pub fn middlewares(&self) -> &[BoxMiddleware] {
        &self.middlewares
    }
}

impl Handler for ChainHandler {
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        self.chained.call(req)
    }
}

impl fmt::Debug for ChainHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainHandler")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::boxed;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;
    use std::sync::Mutex;

    type Order = Arc<Mutex<Vec<(usize, &'static str)>>>;

    /// Records when it runs relative to the rest of the chain
    struct OrderTracking {
        id: usize,
        order: Order,
    }

    impl Middleware for OrderTracking {
        fn wrap(&self, next: BoxHandler) -> BoxHandler {
            let id = self.id;
            let order = self.order.clone();
            boxed(move |req: Request| {
                let next = next.clone();
                let order = order.clone();
                async move {
                    order.lock().unwrap().push((id, "pre"));
                    let response = next.call(req).await;
                    order.lock().unwrap().push((id, "post"));
                    response
                }
            })
        }
    }

    fn status_handler(status: StatusCode) -> BoxHandler {
        boxed(move |_: Request| async move {
            let mut response = http::Response::new(Full::new(Bytes::from("test")));
            *response.status_mut() = status;
            response
        })
    }

    #[tokio::test]
    async fn test_first_middleware_is_outermost() {
        let order: Order = Arc::default();
        let chain = Chain::new()
            .push(OrderTracking { id: 0, order: order.clone() })
            .push(OrderTracking { id: 1, order: order.clone() })
            .push(OrderTracking { id: 2, order: order.clone() });
        assert_eq!(chain.len(), 3);

        let handler = chain.handler(|_: Request| async { "done" });
        let response = handler.call(Request::get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                (0, "pre"),
                (1, "pre"),
                (2, "pre"),
                (2, "post"),
                (1, "post"),
                (0, "post"),
            ]
        );
    }

    #[tokio::test]
    async fn test_closure_middleware_can_short_circuit() {
        let deny = |_next: BoxHandler| -> BoxHandler {
            boxed(|_: Request| async { StatusCode::FORBIDDEN })
        };
        let handler = ChainHandler::new(vec![Arc::new(deny) as BoxMiddleware], status_handler(StatusCode::OK));
        let response = handler.call(Request::get("/")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(handler.middlewares().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_is_the_endpoint() {
        let handler = chain(&[], status_handler(StatusCode::ACCEPTED));
        let response = handler.call(Request::get("/")).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_chain_preserves_handler_response(
            handler_status in 200u16..600u16,
            depth in 0usize..6,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let order: Order = Arc::default();
                let middlewares: Vec<BoxMiddleware> = (0..depth)
                    .map(|id| Arc::new(OrderTracking { id, order: order.clone() }) as BoxMiddleware)
                    .collect();

                let status = StatusCode::from_u16(handler_status).unwrap_or(StatusCode::OK);
                let handler = chain(&middlewares, status_handler(status));
                let response = handler.call(Request::get("/test")).await;

                prop_assert_eq!(response.status(), status);

                let order = order.lock().unwrap();
                prop_assert_eq!(order.len(), depth * 2);
                for id in 0..depth {
                    prop_assert_eq!(order[id], (id, "pre"));
                    prop_assert_eq!(order[depth * 2 - 1 - id], (id, "post"));
                }
                Ok(())
            });
            result?;
        }
    }
}
