//! Axum router for the wrapper's control endpoints.
//!
//! | Route            | Operation                      | Success |
//! |------------------|--------------------------------|---------|
//! | `GET /health`    | liveness probe                 | `200 ok` |
//! | `GET /status`    | [`Supervisor::status`]         | `200 {"Status": …}` |
//! | `POST /command`  | [`Supervisor::send`] (body)    | `204` |
//! | `POST /stop`     | [`Supervisor::stop`]           | `204` |
//! | `POST /save`     | [`Supervisor::save`]           | `204` |
//! | `POST /snapshot` | [`Supervisor::snapshot`]       | `204` |
//!
//! Failures are returned as `{"error": "…"}`.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::{ErrorResponse, StatusResponse};
use crate::{AppError, Result, Supervisor};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidCommand(_) => StatusCode::BAD_REQUEST,
            AppError::NotRunning(_) | AppError::Abandoned(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router with `supervisor` as shared state.
pub fn router(supervisor: Supervisor) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/command", post(command))
        .route("/stop", post(stop))
        .route("/save", post(save))
        .route("/snapshot", post(snapshot))
        .with_state(supervisor)
}

/// Bind the control surface listener.
///
/// # Errors
///
/// Returns `AppError::Http` if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Http(format!("failed to bind {addr}: {err}")))
}

/// Serve the control surface on `listener` until `ct` fires.
///
/// # Errors
///
/// Returns `AppError::Http` if the server fails.
pub async fn serve(listener: TcpListener, supervisor: Supervisor, ct: CancellationToken) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "starting HTTP control surface");
    }

    axum::serve(listener, router(supervisor))
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
        })
        .await
        .map_err(|err| AppError::Http(format!("server error: {err}")))?;

    info!("HTTP control surface shut down");
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn status(State(supervisor): State<Supervisor>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: supervisor.status(),
    })
}

async fn command(State(supervisor): State<Supervisor>, body: String) -> Result<StatusCode> {
    let command = body.trim_end_matches(['\r', '\n']);
    supervisor.send(command).await.map_err(|err| {
        warn!(%err, command, "console command failed");
        err
    })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stop(State(supervisor): State<Supervisor>) -> Result<StatusCode> {
    supervisor.stop().await.map_err(|err| {
        warn!(%err, "stop failed");
        err
    })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn save(State(supervisor): State<Supervisor>) -> Result<StatusCode> {
    supervisor.save().await.map_err(|err| {
        warn!(%err, "save failed");
        err
    })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn snapshot(State(supervisor): State<Supervisor>) -> Result<StatusCode> {
    supervisor.snapshot().await.map_err(|err| {
        warn!(%err, "snapshot failed");
        err
    })?;
    Ok(StatusCode::NO_CONTENT)
}
