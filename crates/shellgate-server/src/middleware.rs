//! Authentication middleware for the Shellgate server.
//!
//! The terminal endpoints require an authenticated caller, but unlike an
//! admin surface any valid token is enough: every authenticated reader
//! of a published guide may use its terminal. Tokens arrive as
//! `Authorization: Bearer <token>`.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Middleware that validates the `Authorization` bearer token.
///
/// Applied via `route_layer` to the terminal routes; health stays open.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if token_matches(&state.api_tokens, token) => next.run(req).await,
        Some(_) => {
            warn!(path = %req.uri().path(), "rejected request with invalid bearer token");
            AppError::Unauthorized("invalid bearer token".to_owned()).into_response()
        }
        None => {
            AppError::Unauthorized("missing Authorization bearer token".to_owned())
                .into_response()
        }
    }
}

/// Compare the presented token against every accepted token in constant
/// time, without short-circuiting on the first byte mismatch.
fn token_matches(accepted: &HashSet<String>, presented: &str) -> bool {
    accepted.iter().fold(false, |found, token| {
        found | bool::from(token.as_bytes().ct_eq(presented.as_bytes()))
    })
}
