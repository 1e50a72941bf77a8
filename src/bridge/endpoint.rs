use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::audio::pcm::samples_to_transport_text;
use crate::error::StreamResult;
use crate::video::{EncodedFrame, JPEG_MIME_TYPE};

/// MIME type of outbound microphone audio
pub const PCM_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Events raised by a live endpoint connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointEvent {
    /// Session is ready to accept media
    Opened,
    /// Base64 PCM16 narration audio (24 kHz mono)
    AudioReceived(String),
    /// Remote side closed the session
    Closed,
    /// Connection or protocol error
    Failed(String),
}

/// One outbound piece of realtime input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaChunk {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

impl MediaChunk {
    /// Microphone block as 16 kHz PCM16
    pub fn audio(samples: &[f32]) -> Self {
        Self {
            mime_type: PCM_MIME_TYPE.to_string(),
            data: samples_to_transport_text(samples),
        }
    }

    /// Sampled video frame as JPEG
    pub fn image(frame: &EncodedFrame) -> Self {
        Self {
            mime_type: JPEG_MIME_TYPE.to_string(),
            data: frame.to_transport_text(),
        }
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type == PCM_MIME_TYPE
    }
}

/// External live-AI service
#[async_trait::async_trait]
pub trait LiveEndpoint: Send + Sync {
    /// Open a duplex session. Every event for the session is sent to `events`.
    async fn connect(
        &self,
        events: mpsc::UnboundedSender<EndpointEvent>,
    ) -> StreamResult<Box<dyn LiveConnection>>;

    /// Endpoint name for logging
    fn name(&self) -> &str;
}

/// Outbound half of an open session
pub trait LiveConnection: Send + Sync {
    /// Queue a chunk for sending. Never blocks.
    fn send(&self, chunk: MediaChunk) -> StreamResult<()>;

    /// Tear the session down without waiting for the remote side. Idempotent.
    fn close(&self);
}
