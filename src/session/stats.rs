use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bridge::BridgeState;

/// Point-in-time view of the admin session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSnapshot {
    /// Whether the broadcast is live
    pub is_live: bool,

    /// Whether AI narration is connecting or connected
    pub ai_enabled: bool,

    /// Narration lifecycle state
    pub narration: BridgeState,

    /// Broadcast status line
    pub status: String,

    /// Narration status line
    pub narration_status: String,

    /// Frames published since the broadcast went live
    pub frames_sent: u64,

    /// Number of comments in the admin chat log
    pub comments_count: usize,

    /// When the session was created
    pub started_at: DateTime<Utc>,
}

/// Point-in-time view of a viewer session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    pub viewer_id: String,

    /// Mirrored broadcast state
    pub is_live: bool,

    /// Latest frame as a data URI, if live
    pub frame: Option<String>,

    /// Shown while there is no frame
    pub waiting_message: String,

    /// Frames received since joining
    pub frames_received: u64,

    /// Number of comments in the viewer chat log
    pub comments_count: usize,
}
