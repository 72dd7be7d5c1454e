//! Middlewares shipped with Trellis
//!
//! Every type here implements [`Middleware`](crate::chain::Middleware), so it
//! can be installed on a whole router with `layer` or on a group of routes
//! with `with`/`group`.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis::prelude::*;
//! use trellis::middleware::{Logger, Recoverer, RequestIdLayer, Heartbeat};
//!
//! let mut mux = Mux::new();
//! mux.layer(RequestIdLayer::new())  // First to process request
//!     .layer(Logger::new())
//!     .layer(Recoverer::new())
//!     .layer(Heartbeat::new("/ping"));
//! mux.get("/", index);
//! ```

mod body_limit;
mod from_fn;
mod heartbeat;
mod logger;
mod recoverer;
mod request_id;
mod strip_slashes;
mod timeout;
mod value;

pub use body_limit::BodyLimit;
pub use from_fn::{from_fn, FromFn, Next};
pub use heartbeat::Heartbeat;
pub use logger::Logger;
pub use recoverer::Recoverer;
pub use request_id::{RequestId, RequestIdLayer, REQUEST_ID_HEADER};
pub use strip_slashes::{RedirectSlashes, StripSlashes};
pub use timeout::Timeout;
pub use value::{with_value, WithValue};
