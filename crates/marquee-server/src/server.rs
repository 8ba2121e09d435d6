//! HTTP server implementation.
//!
//! The server owns the transport concerns the route table does not:
//!
//! - TCP accept loop and HTTP/1.1 connections via Hyper
//! - Body buffering with a size limit
//! - A per-request deadline
//! - The `/health` liveness endpoint
//! - Graceful shutdown
//!
//! Everything else is handed to the [`RouteTable`] as a buffered request.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use marquee_core::RequestId;
use marquee_middleware::{error_response, Response, ResponseExt, RouteTable, REQUEST_ID_HEADER};
use marquee_telemetry::metrics::InFlightGuard;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Liveness endpoint served outside the pipeline.
pub const HEALTH_PATH: &str = "/health";

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Bind address.
    pub http_addr: String,
    /// How long to wait for connections to drain on shutdown.
    pub shutdown_timeout: Duration,
    /// Deadline covering body collection and pipeline traversal.
    pub request_timeout: Duration,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            shutdown_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// The Marquee HTTP server.
///
/// # Example
///
/// ```rust,ignore
/// let server = Server::new(settings, Arc::new(table));
/// server.run().await?;
/// ```
pub struct Server {
    settings: ServerSettings,
    table: Arc<RouteTable>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Creates a server for `table`.
    #[must_use]
    pub fn new(settings: ServerSettings, table: Arc<RouteTable>) -> Self {
        Self { settings, table }
    }

    /// Returns the transport settings.
    #[must_use]
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Binds and serves until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds and serves until `shutdown` is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr =
            self.settings
                .http_addr
                .parse()
                .map_err(|e: std::net::AddrParseError| ServerError::InvalidAddress {
                    addr: self.settings.http_addr.clone(),
                    reason: e.to_string(),
                })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// is triggered, then waits up to the shutdown timeout for open
    /// connections to finish.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) {
        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, "server listening");
        }

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let token = tracker.acquire();
                        let server = Arc::clone(&server);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            server.serve_connection(stream, remote, shutdown).await;
                            drop(token);
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let timeout = server.settings.shutdown_timeout;
        info!(
            active = tracker.active_connections(),
            timeout_secs = timeout.as_secs(),
            "waiting for connections to close"
        );
        if tokio::time::timeout(timeout, tracker.wait_for_drain())
            .await
            .is_err()
        {
            warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }
        info!("server stopped");
    }

    async fn serve_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote: SocketAddr,
        shutdown: ShutdownSignal,
    ) {
        let server = Arc::clone(&self);
        let service = service_fn(move |request: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(request).await) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        let result = tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        };

        if let Err(e) = result {
            debug!(remote = %remote, error = %e, "connection closed with error");
        }
    }

    /// Handles one request: health check, body collection, then the route
    /// table, all under the request deadline.
    ///
    /// Every response carries `x-request-id`.
    pub async fn handle<B>(&self, request: http::Request<B>) -> Response
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let _in_flight = InFlightGuard::new();
        let (mut parts, body) = request.into_parts();

        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_default();
        let id_header = HeaderValue::from_str(&request_id.to_string()).ok();

        let mut response = if parts.method == Method::GET && parts.uri.path() == HEALTH_PATH {
            health_response()
        } else {
            if let Some(value) = &id_header {
                parts.headers.insert(REQUEST_ID_HEADER, value.clone());
            }
            let method = parts.method.clone();
            let path = parts.uri.path().to_string();
            let limit = self.settings.max_body_bytes;

            let work = async move {
                match Limited::new(body, limit).collect().await {
                    Ok(collected) => {
                        let request = http::Request::from_parts(parts, collected.to_bytes());
                        self.table.handle(request).await
                    }
                    Err(err) => body_error(&*err, limit, request_id),
                }
            };

            match tokio::time::timeout(self.settings.request_timeout, work).await {
                Ok(response) => response,
                Err(_) => {
                    warn!(
                        request_id = %request_id,
                        http.method = %method,
                        http.path = %path,
                        "request timed out"
                    );
                    error_response(
                        StatusCode::GATEWAY_TIMEOUT,
                        "GATEWAY_TIMEOUT",
                        "The request did not complete in time",
                        request_id,
                        None,
                    )
                }
            }
        };

        if let Some(value) = id_header {
            response.headers_mut().entry(REQUEST_ID_HEADER).or_insert(value);
        }
        response
    }
}

fn health_response() -> Response {
    Response::json_bytes(StatusCode::OK, br#"{"status":"ok"}"#.to_vec())
}

fn body_error(err: &(dyn StdError + Send + Sync + 'static), limit: usize, request_id: RequestId) -> Response {
    if err.is::<LengthLimitError>() {
        error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            &format!("request body exceeds {limit} bytes"),
            request_id,
            None,
        )
    } else {
        debug!(request_id = %request_id, error = %err, "failed to read request body");
        error_response(
            StatusCode::BAD_REQUEST,
            "BODY_READ_ERROR",
            "The request body could not be read",
            request_id,
            None,
        )
    }
}
