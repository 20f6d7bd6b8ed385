//! System routes: `/v1/sys/*`

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Build the `/v1/sys` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// Response body for `GET /v1/sys/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Number of live terminal sessions in the registry.
    pub active_sessions: usize,
}

/// Liveness probe with the current session count.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_sessions: state.controller.registry().active_count(),
    })
}
