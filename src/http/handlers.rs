use super::state::AppState;
use crate::error::{ChatError, StreamError};
use crate::session::ViewerSession;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentRequest {
    /// Display name
    pub user: String,

    /// Comment body
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub viewer_id: String,
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn stream_error(e: StreamError) -> Response {
    let status = match e {
        StreamError::NotLive => StatusCode::CONFLICT,
        StreamError::MediaAcquisition(_)
        | StreamError::EndpointConnection(_)
        | StreamError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, e.to_string())
}

fn chat_error(e: ChatError) -> Response {
    error_response(StatusCode::BAD_REQUEST, e.to_string())
}

fn viewer_not_found(viewer_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Viewer {} not found", viewer_id),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /admin/status
pub async fn admin_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.admin.snapshot())
}

/// POST /admin/stream/start
/// Go live
pub async fn start_stream(State(state): State<AppState>) -> Response {
    match state.admin.start_live() {
        Ok(()) => (StatusCode::OK, Json(state.admin.snapshot())).into_response(),
        Err(e) => {
            error!("Failed to start broadcast: {}", e);
            stream_error(e)
        }
    }
}

/// POST /admin/stream/stop
pub async fn stop_stream(State(state): State<AppState>) -> impl IntoResponse {
    state.admin.stop_live();
    Json(state.admin.snapshot())
}

/// POST /admin/narration/enable
/// Open the AI narration session (broadcast must be live)
pub async fn enable_narration(State(state): State<AppState>) -> Response {
    match state.admin.enable_narration().await {
        Ok(()) => (StatusCode::OK, Json(state.admin.snapshot())).into_response(),
        Err(e) => {
            warn!("Failed to enable narration: {}", e);
            stream_error(e)
        }
    }
}

/// POST /admin/narration/disable
pub async fn disable_narration(State(state): State<AppState>) -> impl IntoResponse {
    state.admin.disable_narration();
    Json(state.admin.snapshot())
}

/// GET /admin/chat
pub async fn admin_chat(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.admin.chat_log())
}

/// POST /admin/chat
pub async fn admin_comment(
    State(state): State<AppState>,
    Json(req): Json<CommentRequest>,
) -> Response {
    match state.admin.submit_comment(&req.user, &req.text) {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => chat_error(e),
    }
}

/// POST /viewers
/// Join the broadcast as a new viewer
pub async fn join_viewer(State(state): State<AppState>) -> Response {
    let member = match state.transport.join(&state.topic).await {
        Ok(member) => member,
        Err(e) => {
            error!("Failed to join {}: {:#}", state.topic, e);
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Failed to join broadcast: {}", e),
            );
        }
    };

    let viewer = match ViewerSession::join(member).await {
        Ok(viewer) => Arc::new(viewer),
        Err(e) => {
            error!("Failed to start viewer: {:#}", e);
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Failed to join broadcast: {}", e),
            );
        }
    };

    let viewer_id = viewer.id().to_string();
    state
        .viewers
        .write()
        .await
        .insert(viewer_id.clone(), viewer);

    info!("Viewer {} connected", viewer_id);

    (
        StatusCode::CREATED,
        Json(JoinResponse {
            viewer_id,
            topic: state.topic.clone(),
        }),
    )
        .into_response()
}

/// GET /viewers/:viewer_id
pub async fn viewer_status(
    State(state): State<AppState>,
    Path(viewer_id): Path<String>,
) -> Response {
    match state.viewer(&viewer_id).await {
        Some(viewer) => Json(viewer.snapshot()).into_response(),
        None => viewer_not_found(&viewer_id),
    }
}

/// GET /viewers/:viewer_id/chat
pub async fn viewer_chat(
    State(state): State<AppState>,
    Path(viewer_id): Path<String>,
) -> Response {
    match state.viewer(&viewer_id).await {
        Some(viewer) => Json(viewer.chat_log()).into_response(),
        None => viewer_not_found(&viewer_id),
    }
}

/// POST /viewers/:viewer_id/chat
pub async fn viewer_comment(
    State(state): State<AppState>,
    Path(viewer_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Response {
    let Some(viewer) = state.viewer(&viewer_id).await else {
        return viewer_not_found(&viewer_id);
    };

    match viewer.submit_comment(&req.user, &req.text) {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => chat_error(e),
    }
}

/// DELETE /viewers/:viewer_id
/// Leave the broadcast
pub async fn leave_viewer(
    State(state): State<AppState>,
    Path(viewer_id): Path<String>,
) -> Response {
    let removed = state.viewers.write().await.remove(&viewer_id);

    match removed {
        Some(viewer) => {
            viewer.leave();
            info!("Viewer {} disconnected", viewer_id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => viewer_not_found(&viewer_id),
    }
}
