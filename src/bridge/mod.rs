//! AI commentary bridge
//!
//! Feeds microphone audio and sampled frames to a live-AI endpoint and plays
//! the narration it sends back through the playback scheduler.
//!
//! State machine: `Disabled → Connecting → Connected → (Closed | Failed)`.
//! There is no automatic reconnect; a failed bridge stays failed until
//! narration is enabled again.

mod commentary;
pub mod endpoint;
pub mod gemini;

pub use commentary::{BridgeConfig, BridgeState, CommentaryBridge};
pub use endpoint::{EndpointEvent, LiveConnection, LiveEndpoint, MediaChunk, PCM_MIME_TYPE};
pub use gemini::{GeminiLiveEndpoint, GeminiSettings, DEFAULT_ENDPOINT_URL};
