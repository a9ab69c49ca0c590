// ABOUTME: HTTP surface: one POST route that accepts push webhooks.
// ABOUTME: Router construction, serving with graceful shutdown, and signal handling.

mod handlers;
mod state;

pub use handlers::hook_handler;
pub use state::AppState;

use std::future::Future;

use axum::{Router, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the router serving the webhook at `path`.
pub fn router(state: AppState, path: &str) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    Router::new()
        .route(&path, post(hook_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `host:port`. The host may be an address or a name to resolve.
///
/// # Errors
///
/// Returns an error if the host does not resolve or the port cannot be bound.
pub async fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind((host, port)).await?;
    info!(address = %listener.local_addr()?, "listening for webhooks");
    Ok(listener)
}

/// Serve on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
