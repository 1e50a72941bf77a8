use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::audio::{MicrophoneInput, NARRATION_SAMPLE_RATE};
use crate::bridge::{BridgeConfig, GeminiSettings, DEFAULT_ENDPOINT_URL};
use crate::session::SessionConfig;
use crate::video::{SamplerConfig, VideoInput};

/// Environment variable holding the narration endpoint credential
pub const API_KEY_VAR: &str = "API_KEY";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub stream: StreamConfig,
    pub bus: BusConfig,
    pub narration: NarrationConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StreamConfig {
    pub topic: String,
    pub frame_interval_ms: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub jpeg_quality: u8,
    /// "test-pattern" or a path to an image file
    pub video_source: String,
}

#[derive(Debug, Deserialize)]
pub struct BusConfig {
    /// "local" or "nats"
    pub transport: String,
    pub nats_url: String,
}

#[derive(Debug, Deserialize)]
pub struct NarrationConfig {
    pub endpoint_url: Option<String>,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
    pub frame_forward_interval_ms: u64,
    /// WAV file replayed as microphone input; narration fails to start without one
    pub microphone_wav: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    /// Must match the narration endpoint's output rate
    pub sample_rate: u32,
    /// Render narration playback to this WAV file instead of discarding it
    pub output_wav: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("STAGECAST").separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.playback.sample_rate != NARRATION_SAMPLE_RATE {
            anyhow::bail!(
                "playback.sample_rate is {}Hz but narration audio is {}Hz",
                self.playback.sample_rate,
                NARRATION_SAMPLE_RATE
            );
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            topic: self.stream.topic.clone(),
            frame_interval: Duration::from_millis(self.stream.frame_interval_ms.max(1)),
            sampler: SamplerConfig {
                width: self.stream.frame_width,
                height: self.stream.frame_height,
                quality: self.stream.jpeg_quality,
            },
        }
    }

    pub fn video_input(&self) -> VideoInput {
        VideoInput::parse(
            &self.stream.video_source,
            self.stream.frame_width,
            self.stream.frame_height,
        )
    }

    pub fn microphone_input(&self) -> MicrophoneInput {
        match self.narration.microphone_wav.as_deref() {
            Some(path) if !path.trim().is_empty() => MicrophoneInput::File(path.to_string()),
            _ => MicrophoneInput::None,
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            frame_forward_interval: Duration::from_millis(
                self.narration.frame_forward_interval_ms.max(1),
            ),
        }
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            api_key: api_key(),
            endpoint_url: self
                .narration
                .endpoint_url
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string()),
            model: self.narration.model.clone(),
            voice: self.narration.voice.clone(),
            system_instruction: self.narration.system_instruction.clone(),
        }
    }
}

/// Endpoint credential: baked in at build time if `API_KEY` was set, else read at runtime
pub fn api_key() -> Option<String> {
    option_env!("API_KEY")
        .map(str::to_string)
        .or_else(|| std::env::var(API_KEY_VAR).ok())
        .filter(|key| !key.trim().is_empty())
}
