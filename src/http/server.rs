//! HTTP server wiring: routes, body limit, connection hardening, access log,
//! graceful shutdown
//!
//! Connections are served through hyper directly so connection-level bounds
//! apply: a header read timeout closes clients that open a socket and never
//! finish their request line, and it re-arms between keep-alive requests,
//! bounding idle connections too. A whole-request timeout layer caps slow
//! body senders and handler time at the configured request timeout plus a
//! small write margin.

use crate::http::handlers::{health_handler, render_pdf_handler, AppState, PdfTiming};
use crate::{Error, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Rendering endpoint path
pub const PATH_PDF: &str = "/api/v1/pdf";
/// Liveness endpoint path
pub const PATH_HEALTHZ: &str = "/healthz";

/// How long a client may take to transmit its request headers.
const READ_HEADER_TIMEOUT: Duration = Duration::from_secs(5);

/// Margin on top of the request timeout so handlers can use the full
/// configured budget before the response write is abandoned.
const WRITE_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Cap on draining in-flight connections at shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout + WRITE_TIMEOUT_MARGIN;
    Router::new()
        .route(PATH_PDF, post(render_pdf_handler))
        .route(PATH_HEALTHZ, get(health_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(access_log))
        .with_state(state)
}

/// Bind the listener and serve until SIGINT/SIGTERM, then drain in-flight
/// connections for at most [`SHUTDOWN_TIMEOUT`].
pub async fn run(addr: &str, state: AppState) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|err| Error::configuration(format!("invalid listen address {addr}: {err}")))?;

    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {addr}");

    let mut connection_builder = ConnectionBuilder::new(TokioExecutor::new());
    connection_builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(READ_HEADER_TIMEOUT);

    let graceful = GracefulShutdown::new();
    let mut shutdown = std::pin::pin!(shutdown_signal());

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(error = %err, "accept error");
                        continue;
                    }
                };

                let app = app.clone();
                let service = service_fn(move |request: hyper::Request<Incoming>| {
                    app.clone().oneshot(request.map(Body::new))
                });

                let connection = connection_builder
                    .serve_connection(TokioIo::new(stream), service)
                    .into_owned();
                let connection = graceful.watch(connection);
                tokio::spawn(async move {
                    if let Err(err) = connection.await {
                        // Routine for aborted clients; nothing to escalate.
                        debug!(error = %err, "connection error");
                    }
                });
            }
            _ = &mut shutdown => break,
        }
    }

    tokio::select! {
        _ = graceful.shutdown() => info!("server shutdown complete"),
        _ = tokio::time::sleep(SHUTDOWN_TIMEOUT) => {
            warn!("shutdown drain timed out, closing remaining connections");
        }
    }

    Ok(())
}

/// Log method, path, status, and latency for every request; successful PDF
/// renders also carry a request id and the print duration.
async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed = start.elapsed();
    match response.extensions().get::<PdfTiming>() {
        Some(PdfTiming(pdf_elapsed)) => {
            let request_id = Uuid::new_v4().simple().to_string();
            info!(%method, %path, status, ?elapsed, %request_id, pdf_time = ?pdf_elapsed, "request");
        }
        None => info!(%method, %path, status, ?elapsed, "request"),
    }

    response
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("installing SIGTERM handler failed");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("installing SIGINT handler failed");

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM signal"),
            _ = sigint.recv() => info!("received SIGINT signal"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received Ctrl+C signal");
    }
}
