//! Shared application state for the Shellgate server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the session lifecycle controller and
//! the accepted API tokens.

use std::collections::HashSet;
use std::sync::Arc;

use shellgate_core::controller::LifecycleController;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Session lifecycle controller (connect/input/close).
    pub controller: Arc<LifecycleController>,
    /// Bearer tokens accepted by the auth middleware.
    pub api_tokens: HashSet<String>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
