//! # Trellis
//!
//! A lightweight, composable HTTP router.
//!
//! Routes live in a radix tree that supports static segments, named
//! parameters (`{id}`), regexp-constrained parameters (`{id:[0-9]+}`) and
//! catch-alls (`*`). Routers can be nested with `route` and `mount`, and
//! middlewares are plain `handler -> handler` wrappers applied per router or
//! per group of routes.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trellis::prelude::*;
//!
//! async fn hello(req: Request) -> String {
//!     format!("hello {}", url_param(&req, "name"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), BoxError> {
//!     trellis::init_tracing();
//!
//!     let mut mux = Mux::new();
//!     mux.layer(RequestIdLayer::new())
//!         .layer(Logger::new())
//!         .layer(Recoverer::new());
//!     mux.get("/hello/{name}", hello);
//!     mux.route("/articles", |r| {
//!         r.get("/", list_articles);
//!         r.get("/{id:[0-9]+}", show_article);
//!     });
//!
//!     Server::from_config(mux, ServerConfig::load()?).run().await
//! }
//! ```
//!
//! ## Configuration
//!
//! [`ServerConfig::load`] reads a `.env` file if present, then `TRELLIS_*`
//! environment variables (`TRELLIS_HOST`, `TRELLIS_PORT`,
//! `TRELLIS_BODY_LIMIT`, `TRELLIS_REQUEST_TIMEOUT_MS`, `TRELLIS_LOG_LEVEL`).
//! `TRELLIS_ENV=production` hides internal error details from responses.

// Re-export core functionality
pub use trellis_core::*;

// Runtime and JSON crates used by applications built on trellis
pub use serde_json;
pub use tokio;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to the
/// default level of the current [`Environment`].
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let fallback = environment().default_log_level().to_string();
    init_tracing_with(&fallback);
}

/// Install a `fmt` subscriber using the log level of `config` when
/// `RUST_LOG` is not set.
pub fn init_tracing_from(config: &ServerConfig) {
    init_tracing_with(&config.log_filter());
}

fn init_tracing_with(fallback: &str) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Prelude module - import everything you need with `use trellis::prelude::*`
pub mod prelude {
    pub use trellis_core::{
        // Error handling
        ApiError,
        BoxError,
        BoxHandler,
        BoxMiddleware,
        // Middleware chaining
        Chain,
        Handler,
        InlineRouter,
        IntoResponse,
        Middleware,
        // Router
        Mux,
        Request,
        Response,
        Result,
        RouteContext,
        Router,
        Routes,
        // Server
        Server,
        ServerConfig,
        serve,
        url_param,
        walk,
    };

    pub use trellis_core::middleware::{
        from_fn, with_value, BodyLimit, Heartbeat, Logger, Next, Recoverer, RedirectSlashes,
        RequestId, RequestIdLayer, StripSlashes, Timeout,
    };

    pub use http::{HeaderMap, Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::json;
    pub use tracing::{debug, error, info, trace, warn};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_imports_work() {
        let _: fn() -> Result<()> = || Ok(());
        let mut mux = Mux::new();
        mux.get("/", |_: Request| async { StatusCode::NO_CONTENT });
        assert_eq!(mux.routes().len(), 1);
    }

    #[test]
    fn init_tracing_is_idempotent() {
        super::init_tracing();
        super::init_tracing();
    }

    #[test]
    fn reexported_runtime_and_json() {
        let mut mux = Mux::new();
        mux.get("/info", |_: Request| async {
            json!({ "name": "trellis" }).to_string()
        });

        let rt = crate::tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let response = rt.block_on(mux.call(Request::new(Method::GET, "/info".parse().unwrap())));
        assert_eq!(response.status(), StatusCode::OK);

        let value: crate::serde_json::Value = crate::serde_json::from_str(r#"{"name":"trellis"}"#).unwrap();
        assert_eq!(value, json!({ "name": "trellis" }));
    }
}
