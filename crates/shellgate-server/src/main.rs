//! Shellgate server entry point.
//!
//! Bootstraps the credential store and session controller, then starts
//! the Axum HTTP server with graceful shutdown. Live terminal streams end
//! when the process stops; sessions are process-local by design.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use shellgate_core::controller::LifecycleController;
use shellgate_core::ssh::SshConnector;

use shellgate_server::config::ServerConfig;
use shellgate_server::routes;
use shellgate_server::state::AppState;
use shellgate_server::store::FileCredentialStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(credentials_file = %config.credentials_file, "Shellgate starting");

    let store = FileCredentialStore::load(&config.credentials_file, config.master_key.clone())?;
    let connector = SshConnector::new(Duration::from_secs(config.connect_timeout_secs));
    let controller = Arc::new(LifecycleController::new(
        Arc::new(store),
        Arc::new(connector),
    ));

    let state = Arc::new(AppState {
        controller,
        api_tokens: config.api_tokens.iter().cloned().collect::<HashSet<_>>(),
    });

    let app = routes::build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Shellgate server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shellgate server stopped");
    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
