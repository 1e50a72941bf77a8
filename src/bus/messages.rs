use serde::{Deserialize, Serialize};

/// Current wall-clock time in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A chat comment from a viewer or the admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user: String,
    pub text: String,
    pub timestamp: i64,  // Milliseconds since epoch
}

/// A message on the broadcast topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub enum BroadcastMessage {
    /// Sampled camera frame as a `data:image/jpeg;base64,...` URI
    VideoFrame { payload: String, timestamp: i64 },
    /// Broadcast went live or stopped
    StatusUpdate { live: bool, timestamp: i64 },
    /// Chat comment
    Comment { payload: ChatMessage, timestamp: i64 },
}

impl BroadcastMessage {
    pub fn video_frame(data_uri: String) -> Self {
        Self::VideoFrame {
            payload: data_uri,
            timestamp: now_millis(),
        }
    }

    pub fn status(live: bool) -> Self {
        Self::StatusUpdate {
            live,
            timestamp: now_millis(),
        }
    }

    pub fn comment(message: ChatMessage) -> Self {
        Self::Comment {
            payload: message,
            timestamp: now_millis(),
        }
    }

    /// Producer wall-clock time at send
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::VideoFrame { timestamp, .. }
            | Self::StatusUpdate { timestamp, .. }
            | Self::Comment { timestamp, .. } => *timestamp,
        }
    }

    /// Wire type tag, for logging
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::VideoFrame { .. } => MessageKind::VideoFrame,
            Self::StatusUpdate { .. } => MessageKind::StatusUpdate,
            Self::Comment { .. } => MessageKind::Comment,
        }
    }
}

/// Wire type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    VideoFrame,
    StatusUpdate,
    Comment,
}

/// `{type, payload, timestamp}` as it travels between processes
#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    kind: MessageKind,
    payload: serde_json::Value,
    timestamp: i64,
}

impl TryFrom<WireEnvelope> for BroadcastMessage {
    type Error = String;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let timestamp = wire.timestamp;
        match wire.kind {
            MessageKind::VideoFrame => match wire.payload {
                serde_json::Value::String(payload) => Ok(Self::VideoFrame { payload, timestamp }),
                other => Err(format!("VIDEO_FRAME payload must be a string, got {}", other)),
            },
            MessageKind::StatusUpdate => match wire.payload {
                serde_json::Value::Bool(live) => Ok(Self::StatusUpdate { live, timestamp }),
                other => Err(format!("STATUS_UPDATE payload must be a boolean, got {}", other)),
            },
            MessageKind::Comment => serde_json::from_value(wire.payload)
                .map(|payload| Self::Comment { payload, timestamp })
                .map_err(|e| format!("COMMENT payload is not a chat message: {}", e)),
        }
    }
}

impl From<BroadcastMessage> for WireEnvelope {
    fn from(message: BroadcastMessage) -> Self {
        match message {
            BroadcastMessage::VideoFrame { payload, timestamp } => WireEnvelope {
                kind: MessageKind::VideoFrame,
                payload: serde_json::Value::String(payload),
                timestamp,
            },
            BroadcastMessage::StatusUpdate { live, timestamp } => WireEnvelope {
                kind: MessageKind::StatusUpdate,
                payload: serde_json::Value::Bool(live),
                timestamp,
            },
            BroadcastMessage::Comment { payload, timestamp } => WireEnvelope {
                kind: MessageKind::Comment,
                payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
                timestamp,
            },
        }
    }
}
