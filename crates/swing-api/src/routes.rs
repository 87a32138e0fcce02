//! Router assembly.

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ApiError, ErrorBody};
use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Create the API router with all endpoints
pub fn router(state: Arc<AppState>) -> Router {
    let max_body_size = state.config.http.max_body_size;

    Router::new()
        // Batch
        .route("/api/v1/analyze", post(handlers::analyze))
        // Sessions
        .route("/api/v1/sessions", post(handlers::create_session))
        .route("/api/v1/sessions/:id", delete(handlers::end_session))
        .route("/api/v1/sessions/:id/frames", post(handlers::push_frames))
        .route("/api/v1/sessions/:id/stats", get(handlers::session_stats))
        .route("/ws/sessions", get(ws::ws_handler))
        // System
        .route("/api/v1/health", get(handlers::health))
        .layer(middleware::from_fn_with_state(state.clone(), request_timeout))
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
}

async fn request_timeout(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let limit = Duration::from_secs(state.config.http.timeout_secs);
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError {
            status: StatusCode::REQUEST_TIMEOUT,
            body: ErrorBody {
                error: "timeout".to_string(),
                message: format!("request exceeded {}s", limit.as_secs()),
            },
        }
        .into_response(),
    }
}
