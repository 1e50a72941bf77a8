pub mod audio;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod video;

pub use audio::{
    AudioClock, AudioSegment, AudioSink, MicrophoneFactory, MicrophoneInput, MicrophoneSource,
    PlaybackScheduler, ScheduledSegment, SystemAudioClock,
};
pub use bridge::{BridgeConfig, BridgeState, CommentaryBridge, GeminiLiveEndpoint, LiveEndpoint};
pub use bus::{create_transport, BroadcastMessage, BusMember, BusTransport, ChatMessage, LocalHub};
pub use config::Config;
pub use error::{ChatError, DecodeError, StreamError, StreamResult};
pub use http::{create_router, AppState};
pub use session::{AdminSession, AdminSnapshot, SessionConfig, ViewerSession, ViewerSnapshot};
pub use video::{EncodedFrame, FrameSampler, SamplerConfig, VideoSource, VideoSourceFactory};
