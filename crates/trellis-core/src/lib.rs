//! # Trellis Core
//!
//! Core library providing the radix tree router, the mux, routing context,
//! middleware chaining and the hyper server adapter of Trellis.
//!
//! This crate is not meant to be used directly. Use `trellis` instead.

mod chain;
mod config;
mod context;
mod error;
mod handler;
mod log_macros;
mod method;
mod mux;
mod params;
mod pattern;
mod request;
mod response;
mod server;
mod service;
mod tree;
mod walk;
pub mod middleware;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use chain::{chain, BoxMiddleware, Chain, ChainHandler, Middleware};
pub use config::{
    environment, load_dotenv, ConfigError, Environment, ServerConfig, DEFAULT_BODY_LIMIT,
    ENV_PREFIX,
};
pub use context::RouteContext;
pub use error::{ApiError, Result, RouteError};
pub use handler::{boxed, BoxHandler, Handler};
pub use method::{split_method_pattern, MethodFilter, STANDARD_METHODS};
pub use mux::{InlineRouter, Mux, Router, Routes};
pub use params::Params;
pub use pattern::{param_keys, NodeKind, Segment, CATCH_ALL_KEY};
pub use request::{url_param, Request};
pub use response::{IntoResponse, Response};
pub use server::{serve, BoxError, Server};
pub use service::HandlerService;
pub use tree::Route;
pub use walk::walk;
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};
