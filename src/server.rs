//! HTTP surface: routes, middleware and error responses.
//!
//! ```text
//! GET  /health   → 200 {"status":"OK"}
//! GET  /version  → 200 "<crate version>"
//! POST /convert  → 200 application/zip | 4xx/5xx {"error":"…"}
//! ```
//!
//! Parameters are resolved from the query string before the body is read,
//! so a malformed request never touches the engine. Every response passes
//! through the same middleware stack: trailing-slash normalisation, panic
//! recovery, `Cache-Control: no-cache` and request tracing.

use crate::convert::{convert, ConversionRequest};
use crate::engine::RasterEngine;
use crate::error::ConvertError;
use crate::params::ConversionParams;
use axum::body::{Body, Bytes};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, ServiceExt};
use http_body_util::LengthLimitError;
use serde::Serialize;
use std::any::Any;
use std::future::{Future, IntoFuture};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::normalize_path::NormalizePath;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// The fully layered application, ready to serve.
pub type App = NormalizePath<Router>;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn RasterEngine>,
    pub version: &'static str,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(engine: Arc<dyn RasterEngine>, max_body_bytes: usize) -> Self {
        Self {
            engine,
            version: crate::VERSION,
            max_body_bytes,
        }
    }
}

/// Build the router with all middleware applied.
pub fn build_app(state: AppState) -> App {
    let router = Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/convert", post(convert_document))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    NormalizePath::trim_trailing_slash(router)
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "OK" })
}

async fn version(State(state): State<AppState>) -> Json<&'static str> {
    Json(state.version)
}

async fn convert_document(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Body,
) -> Result<Response, ConvertError> {
    let Query(pairs) = query.map_err(|e| ConvertError::InvalidQuery(e.body_text()))?;
    let config = ConversionParams::from_pairs(pairs).resolve()?;

    let input = read_body(body, state.max_body_bytes).await?;
    let output = convert(state.engine.clone(), ConversionRequest::new(input, config)).await?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"))],
        output.archive,
    )
        .into_response())
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, ConvertError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeded_limit(&e) {
            ConvertError::BodyTooLarge { limit }
        } else {
            ConvertError::BodyRead(e.to_string())
        }
    })
}

fn exceeded_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

// ── Error responses ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn error_response(status: StatusCode, message: &'static str) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

fn status_for(err: &ConvertError) -> StatusCode {
    match err {
        ConvertError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_client_error() {
            warn!(
                status = status.as_u16(),
                error = %self,
                "conversion request rejected"
            );
        } else {
            error!(
                status = status.as_u16(),
                stage = self.stage(),
                page = self.page(),
                error = %self,
                "conversion failed"
            );
        }
        error_response(status, self.client_message())
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    error!(panic = detail, "request handler panicked");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

// ── Serving ──────────────────────────────────────────────────────────────

/// Serve `app` until `shutdown` resolves, then drain in-flight requests for
/// at most `grace`.
///
/// # Errors
/// Accept-loop failures, and [`io::ErrorKind::TimedOut`] when connections
/// are still open once the grace period has elapsed.
pub async fn serve<F>(
    listener: TcpListener,
    app: App,
    grace: Duration,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutdown requested, draining connections for up to {:?}", grace);
            let _ = signalled_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        biased;
        result = &mut server => return result,
        _ = signalled_rx => {}
    }

    match tokio::time::timeout(grace, server).await {
        Ok(result) => {
            info!("Server stopped");
            result
        }
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connections still open after {:?} grace period", grace),
        )),
    }
}

/// Resolves on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
