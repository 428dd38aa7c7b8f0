//! HTTP server for docbot.
//!
//! Exposes the chat endpoint as a server-sent-events stream plus a
//! health check, with CORS configured for the documentation site.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;

use axum::Router;
use docbot_core::{AppError, AppResult};

/// Bind and serve the application until the process is stopped.
pub async fn serve(bind: &str, app: Router) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Other(e.to_string()))?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Other(format!("server error: {}", e)))?;
    Ok(())
}
