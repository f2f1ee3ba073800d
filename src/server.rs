//! HTTP surface for the REPL session.
//!
//! Mounts two routes behind a request-logging middleware:
//!
//! - `POST /repl` — forwards the raw request body to the session after a
//!   minimal shape check (the body must parse as a JSON object; its fields
//!   stay opaque and the original bytes, not a re-serialization, are
//!   written to the REPL).
//! - `GET /healthz` — liveness probe backed by the session's lock-free
//!   exit observation.
//!
//! The completion flag from [`ExecOutcome`] is surfaced as the
//! `x-repl-complete` response header so callers can distinguish a finished
//! response from one truncated by the timeout.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::session::{ExecOutcome, ReplSession};
use crate::{AppError, Result};

/// Name of the response header carrying the completion flag.
pub const COMPLETE_HEADER: &str = "x-repl-complete";

/// Shared state handed to every request handler.
pub struct AppState {
    /// The managed REPL session.
    pub session: Arc<ReplSession>,
    /// Default per-command timeout applied when the request does not
    /// override it.
    pub default_timeout: Option<Duration>,
}

/// Build the service router.
///
/// Separated from [`serve`] so tests can drive the router in-process with
/// `tower::ServiceExt::oneshot`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/repl", post(execute_command))
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Bind `port` on all interfaces and serve until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the port cannot be bound, or
/// `AppError::Io` if the server fails while running.
pub async fn serve(state: Arc<AppState>, port: u16, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {bind}: {err}")))?;

    info!(%bind, "http server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(err.to_string()))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// Query parameters accepted by `POST /repl`.
#[derive(Debug, Deserialize)]
struct ExecParams {
    /// Per-command timeout override in seconds; `0` disables the deadline.
    timeout_seconds: Option<u64>,
}

/// Handler for `POST /repl`.
///
/// The optional `timeout_seconds` query parameter overrides the service
/// default for this command; `0` disables the deadline entirely.
async fn execute_command(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExecParams>,
    body: Bytes,
) -> Response {
    // Minimal shape check only: the command must be one JSON object. Its
    // fields are opaque here and the raw bytes are forwarded untouched.
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) if value.is_object() => {}
        Ok(_) => {
            return (StatusCode::BAD_REQUEST, "command must be a JSON object").into_response();
        }
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("invalid JSON format: {err}"),
            )
                .into_response();
        }
    }

    let timeout = match params.timeout_seconds {
        Some(0) => None,
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => state.default_timeout,
    };

    match state.session.execute(&body, timeout).await {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => {
            warn!(%err, "repl command failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("repl error: {err}")).into_response()
        }
    }
}

/// Handler for `GET /healthz`.
///
/// Reports `200 OK` while the REPL process is running and
/// `503 Service Unavailable` once its exit has been observed.
async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    if state.session.is_alive() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "repl process is not running")
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Log every request on arrival and its status on completion.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    info!(%method, %path, "received request");
    let response = next.run(request).await;
    info!(%method, %path, status = %response.status(), "response sent");

    response
}

// ── Private helpers ──────────────────────────────────────────────────────────

/// Build the success response for a completed or truncated exchange.
fn outcome_response(outcome: ExecOutcome) -> Response {
    let complete = if outcome.complete {
        HeaderValue::from_static("true")
    } else {
        HeaderValue::from_static("false")
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::HeaderName::from_static(COMPLETE_HEADER), complete),
        ],
        outcome.response,
    )
        .into_response()
}

