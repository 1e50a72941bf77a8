use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Broadcast control
        .route("/admin/status", get(handlers::admin_status))
        .route("/admin/stream/start", post(handlers::start_stream))
        .route("/admin/stream/stop", post(handlers::stop_stream))
        .route("/admin/narration/enable", post(handlers::enable_narration))
        .route("/admin/narration/disable", post(handlers::disable_narration))
        .route(
            "/admin/chat",
            get(handlers::admin_chat).post(handlers::admin_comment),
        )
        // Viewers
        .route("/viewers", post(handlers::join_viewer))
        .route(
            "/viewers/:viewer_id",
            get(handlers::viewer_status).delete(handlers::leave_viewer),
        )
        .route(
            "/viewers/:viewer_id/chat",
            get(handlers::viewer_chat).post(handlers::viewer_comment),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
