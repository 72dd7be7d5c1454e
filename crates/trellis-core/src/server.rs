//! HTTP server implementation

use crate::chain::Middleware;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::handler::{BoxHandler, Handler};
use crate::log_macros::{log_debug, log_error, log_info};
use crate::middleware::Timeout;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

/// Error type returned by the server entrypoints.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serves a handler (usually a [`Mux`](crate::Mux)) over HTTP/1.1.
///
/// ```rust,ignore
/// let config = ServerConfig::load()?;
/// Server::from_config(mux, config).run().await?;
/// ```
pub struct Server {
    handler: BoxHandler,
    config: ServerConfig,
}

impl Server {
    /// Create a server with the default configuration.
    pub fn new<H: Handler>(handler: H) -> Self {
        Self::from_config(handler, ServerConfig::default())
    }

    pub fn from_config<H: Handler>(handler: H, config: ServerConfig) -> Self {
        let mut handler: BoxHandler = Arc::new(handler);
        if let Some(timeout) = config.request_timeout() {
            handler = Timeout::new(timeout).wrap(handler);
        }
        Self { handler, config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn run(self) -> Result<(), BoxError> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Bind the configured address and serve until `signal` completes.
    pub async fn run_with_shutdown<F>(self, signal: F) -> Result<(), BoxError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.config.addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve_listener(listener, signal).await
    }

    /// Serve connections accepted on `listener` until `signal` completes.
    ///
    /// Connections already accepted keep running after the signal.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub async fn serve_listener<F>(self, listener: TcpListener, signal: F) -> Result<(), BoxError>
    where
        F: Future<Output = ()> + Send,
    {
        let local = listener.local_addr()?;
        log_info!("trellis server running on http://{}", local);

        let body_limit = self.config.body_limit;
        let handler = self.handler;
        tokio::pin!(signal);

        loop {
            let (stream, remote_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut signal => {
                    log_info!("Shutdown signal received");
                    return Ok(());
                }
            };
            let io = TokioIo::new(stream);
            let handler = handler.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<Incoming>| {
                    let handler = handler.clone();
                    async move {
                        let response = handle_request(&handler, req, body_limit, remote_addr).await;
                        Ok::<_, Infallible>(response)
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    log_error!("Connection error: {}", err);
                }
            });
        }
    }
}

/// Serve `handler` on `addr` with the default configuration.
pub async fn serve<H: Handler>(addr: impl AsRef<str>, handler: H) -> Result<(), BoxError> {
    let addr: SocketAddr = addr.as_ref().parse()?;
    let config = ServerConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        ..ServerConfig::default()
    };
    Server::from_config(handler, config).run().await
}

/// Buffer the body of a hyper request and dispatch it.
pub(crate) async fn handle_request<B>(
    handler: &BoxHandler,
    req: hyper::Request<B>,
    body_limit: usize,
    remote_addr: SocketAddr,
) -> Response
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let (mut parts, body) = req.into_parts();
    let body = match Limited::new(body, body_limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            let error = if err.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::payload_too_large(format!(
                    "Request body exceeds limit of {} bytes",
                    body_limit
                ))
            } else {
                ApiError::bad_request("Failed to read request body").with_internal(err.to_string())
            };
            let response = error.into_response();
            log_request(&method, &path, response.status(), start);
            return response;
        }
    };

    parts.extensions.insert(remote_addr);
    let response = handler.call(Request::from_parts(parts, body)).await;

    log_request(&method, &path, response.status(), start);
    response
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn log_request(method: &http::Method, path: &str, status: StatusCode, start: Instant) {
    log_debug!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request served"
    );
}
