//! HTTP route modules and router assembly.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::middleware as axum_mw;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::auth_middleware;
use crate::state::AppState;

pub mod sys;
pub mod terminal;

/// Ceiling on concurrently-processed terminal requests. Streaming
/// responses do not count once the handler has returned the body.
const TERMINAL_CONCURRENCY_LIMIT: usize = 64;

/// Build the full application router with auth, tracing, CORS, and
/// security headers.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Terminal routes require a bearer token; health stays open.
    let terminal_routes = Router::new()
        .nest("/v1/terminal", terminal::router())
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ))
        .layer(tower::limit::ConcurrencyLimitLayer::new(
            TERMINAL_CONCURRENCY_LIMIT,
        ));

    // The guide-viewer page may be served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    Router::new()
        .nest("/v1/sys", sys::router())
        .merge(terminal_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
