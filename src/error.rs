use thiserror::Error;

/// Result type alias for session and bridge operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Failures surfaced to the user as short status strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Camera or microphone unavailable or denied
    #[error("media unavailable: {0}")]
    MediaAcquisition(String),

    /// Narration endpoint unreachable or failed mid-session
    #[error("narrator connection failed: {0}")]
    EndpointConnection(String),

    /// Missing or invalid configuration (e.g. no endpoint credential)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Narration requested while the broadcast is offline
    #[error("broadcast is not live")]
    NotLive,
}

/// Malformed inbound audio; the segment is dropped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid transport text: {0}")]
    TransportText(String),

    #[error("PCM payload has odd length ({0} bytes)")]
    OddLength(usize),
}

/// Rejected chat submissions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("comment text is empty")]
    EmptyText,

    #[error("display name is empty")]
    EmptyUser,
}
