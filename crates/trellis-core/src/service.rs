//! Tower integration
//!
//! [`HandlerService`] exposes any handler, a whole [`Mux`](crate::Mux)
//! included, as a `tower_service::Service`, so it can be driven by other
//! tower-based servers and utilities.

use crate::handler::{BoxHandler, Handler};
use crate::request::Request;
use crate::response::Response;
use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_service::Service;

/// A handler wrapped as a tower service.
#[derive(Clone)]
pub struct HandlerService {
    handler: BoxHandler,
}

impl HandlerService {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn from_boxed(handler: BoxHandler) -> Self {
        Self { handler }
    }
}

impl Service<Request> for HandlerService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        self.handler.call(req).map(Ok).boxed()
    }
}

impl Service<http::Request<Bytes>> for HandlerService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Bytes>) -> Self::Future {
        self.handler.call(Request::from(req)).map(Ok).boxed()
    }
}
