use std::time::Duration;

use crate::bus::DEFAULT_TOPIC;
use crate::video::SamplerConfig;

/// Configuration for the admin broadcast session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Broadcast topic shared with viewers
    pub topic: String,

    /// Period of the frame sampler while live
    /// Default: 100ms (10 frames per second)
    pub frame_interval: Duration,

    /// Resolution and JPEG quality of sampled frames
    pub sampler: SamplerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            frame_interval: Duration::from_millis(100),
            sampler: SamplerConfig::default(),
        }
    }
}
