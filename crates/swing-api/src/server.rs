//! Server startup and shutdown.

use std::sync::Arc;

use crate::error::ServerError;
use crate::routes::router;
use crate::state::AppState;

/// Serve until Ctrl-C, then close every live session
pub async fn serve(state: Arc<AppState>) -> Result<(), ServerError> {
    let reaper = state.sessions.spawn_reaper();
    let app = router(state.clone());

    let addr = state.config.http.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Swing analysis server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    for id in state.sessions.active_sessions().await {
        if let Err(e) = state.sessions.cancel_session(id).await {
            tracing::debug!(session = %id, error = %e, "Session already closed");
        }
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
