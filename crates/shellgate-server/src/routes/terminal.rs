//! Terminal bridge routes: `/v1/terminal/*`
//!
//! The three operations of the browser-to-SSH bridge. `connect` holds its
//! response open and flushes shell output incrementally; the browser
//! cannot write into the stream it is reading, so keystrokes arrive as
//! separate `input` POSTs routed to the same session by connection id.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/v1/terminal` router.
///
/// Paths:
/// - `GET  /v1/terminal/connect/{id}`: open a session, stream shell output
/// - `POST /v1/terminal/input/{id}`: forward raw input bytes
/// - `POST /v1/terminal/close/{id}`: tear the session down
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/connect/{id}", get(connect))
        .route("/input/{id}", post(input))
        .route("/close/{id}", post(close))
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct InputResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub status: &'static str,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Establish a session for a credential id and stream remote shell output
/// as the response body.
///
/// The body is a raw byte stream, not an event framing: the terminal
/// emulator feeds it straight into its parser. If the transport fails
/// mid-stream the body terminates with an error rather than a silent
/// truncation, and the session is already torn down by the time the
/// client notices.
async fn connect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let output = state.controller.connect(&id).await?;
    let body = Body::from_stream(ReceiverStream::new(output));

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            // Defeat proxy buffering; the stream must flush per chunk.
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response())
}

/// Forward one chunk of input bytes to the live session.
///
/// The body is opaque bytes; control sequences and non-UTF-8 terminal
/// input pass through unmodified. Returns `not-connected` when no session
/// is live for the id, so the client can surface it or reconnect instead
/// of typing into the void.
async fn input(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<InputResponse>, AppError> {
    state.controller.input(&id, body.to_vec())?;
    Ok(Json(InputResponse { status: "ok" }))
}

/// Tear down the session for a connection id. Idempotent; always succeeds.
async fn close(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<CloseResponse> {
    state.controller.close(&id).await;
    Json(CloseResponse { status: "closed" })
}
