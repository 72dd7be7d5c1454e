//! Panic recovery middleware

use crate::chain::Middleware;
use crate::error::ApiError;
use crate::handler::{boxed, BoxHandler};
use crate::log_macros::log_error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// Turns a panicking handler into a `500 Internal Server Error`.
///
/// Panics raised while the handler builds its future and while the future
/// runs are both caught. The panic payload is logged at `error` level and
/// only exposed in the response body outside production.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recoverer;

impl Recoverer {
    pub fn new() -> Self {
        Self
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn recovered(method: &str, path: &str, payload: Box<dyn Any + Send>) -> Response {
    let message = panic_message(payload.as_ref());
    log_error!(method = %method, path = %path, panic = %message, "Handler panicked");
    ApiError::internal("Internal server error")
        .with_internal(message)
        .into_response()
}

impl Middleware for Recoverer {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        boxed(move |req: Request| {
            let method = req.method().to_string();
            let path = req.path().to_string();

            match std::panic::catch_unwind(AssertUnwindSafe(|| next.call(req))) {
                Ok(fut) => AssertUnwindSafe(fut)
                    .catch_unwind()
                    .map(move |result| match result {
                        Ok(response) => response,
                        Err(payload) => recovered(&method, &path, payload),
                    })
                    .boxed(),
                Err(payload) => {
                    futures_util::future::ready(recovered(&method, &path, payload)).boxed()
                }
            }
        })
    }
}
