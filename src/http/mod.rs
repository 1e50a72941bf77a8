//! HTTP API for driving the broadcast
//!
//! - GET /health - Health check
//! - GET /admin/status - Broadcast and narration status
//! - POST /admin/stream/start, /admin/stream/stop - Go live / stop
//! - POST /admin/narration/enable, /admin/narration/disable - AI narration toggle
//! - GET|POST /admin/chat - Admin chat log / post a comment
//! - POST /viewers - Join as a viewer
//! - GET|DELETE /viewers/:id - Viewer state / leave
//! - GET|POST /viewers/:id/chat - Viewer chat log / post a comment

mod handlers;
mod routes;
mod state;

pub use handlers::{CommentRequest, ErrorResponse, JoinResponse};
pub use routes::create_router;
pub use state::AppState;
