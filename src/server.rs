//! HTTP host for a [`HandlerFunc`], with graceful shutdown.
//!
//! The server is deliberately thin. hyper owns the connection; the server
//! buffers each request body, hands writer and request to the handler on
//! tokio's blocking pool (pipelines are synchronous and may block), and sends
//! back whatever was written.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`; no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::{Error, panic_message, status_of};
use crate::legacy::HandlerFunc;
use crate::request::{RemoteAddr, Request};
use crate::response::ResponseWriter;

/// The HTTP server.
///
/// ```rust,no_run
/// use plait::{Container, DefaultContainer, Handler, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), plait::Error> {
///     let app = Handler::new(|c: &mut DefaultContainer| c.response_writer().write("hi"));
///
///     Server::bind("0.0.0.0:3000")
///         .serve(app.to_handler_func(DefaultContainer::new))
///         .await
/// }
/// ```
pub struct Server {
    addr: String,
}

impl Server {
    /// Configures the server to bind to `addr` (`host:port`) when
    /// [`serve`](Server::serve) is called.
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Serves `handler` until SIGTERM or Ctrl-C, then drains in-flight
    /// connections.
    pub async fn serve(self, handler: HandlerFunc) -> Result<(), Error> {
        self.serve_with_shutdown(handler, shutdown_signal()).await
    }

    /// Serves `handler` until `signal` resolves, then drains in-flight
    /// connections.
    pub async fn serve_with_shutdown<S>(self, handler: HandlerFunc, signal: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let addr: SocketAddr = self.addr.parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!(addr = %listener.local_addr()?, "plait listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting new
                // connections even if more are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let handler = handler.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection, not once
                        // per connection.
                        let svc = service_fn(move |req| {
                            let handler = handler.clone();
                            async move { dispatch(handler, req, remote_addr).await }
                        });

                        // `auto::Builder` handles both HTTP/1.1 and HTTP/2.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain: wait for every in-flight connection to finish before we return.
        while tasks.join_next().await.is_some() {}

        info!("plait stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through `handler` and produces one response.
///
/// All failures become responses, so hyper never sees an error: an unreadable
/// body is `400`, a panicking pipeline is `500` or the status of the
/// [`StatusError`](crate::StatusError) it panicked with.
async fn dispatch(
    handler: HandlerFunc,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(status_response(StatusCode::BAD_REQUEST));
        }
    };

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(RemoteAddr(remote_addr));
    let method = req.method().clone();
    let uri = req.uri().clone();

    let served = tokio::task::spawn_blocking(move || {
        let mut rw = ResponseWriter::new();
        handler.serve(&mut rw, &mut req);
        rw
    })
    .await;

    match served {
        Ok(rw) => Ok(rw.into_response()),
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let status = status_of(payload.as_ref());
            error!(
                peer = %remote_addr,
                %method,
                %uri,
                status = status.as_u16(),
                panic = %panic_message(payload.as_ref()),
                "handler panicked"
            );
            Ok(status_response(status))
        }
        Err(e) => {
            error!(peer = %remote_addr, %method, %uri, "handler task failed: {e}");
            Ok(status_response(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

fn status_response(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut rw = ResponseWriter::new();
    rw.write_header(status);
    rw.into_response()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (sent by `kubectl` and the
/// Kubernetes control plane) and **SIGINT** (Ctrl-C, for local dev).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
