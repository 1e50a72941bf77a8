use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};

use super::source::VideoSource;
use crate::audio::pcm::to_transport_text;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// Resolution and quality of sampled frames
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1-100 (low by default: frames are sampled ten times a second)
    pub quality: u8,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            quality: 60,
        }
    }
}

/// A compressed still image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedFrame {
    /// Bare base64 of the JPEG bytes
    pub fn to_transport_text(&self) -> String {
        to_transport_text(&self.jpeg)
    }

    /// `data:image/jpeg;base64,...`, as carried in `VIDEO_FRAME` payloads
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", JPEG_MIME_TYPE, self.to_transport_text())
    }
}

/// Rasterizes a video source into fixed-size JPEG stills
#[derive(Debug, Clone)]
pub struct FrameSampler {
    config: SamplerConfig,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config: SamplerConfig {
                width: config.width.max(1),
                height: config.height.max(1),
                quality: config.quality.clamp(1, 100),
            },
        }
    }

    pub fn config(&self) -> SamplerConfig {
        self.config
    }

    /// Capture and encode the source's current picture
    pub fn sample_frame(&self, source: &mut dyn VideoSource) -> Result<EncodedFrame> {
        let image = source.capture().context("Video capture failed")?;

        let image = if image.dimensions() == (self.config.width, self.config.height) {
            image
        } else {
            imageops::resize(
                &image,
                self.config.width,
                self.config.height,
                FilterType::Triangle,
            )
        };

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.config.quality)
            .encode_image(&image)
            .context("JPEG encoding failed")?;

        Ok(EncodedFrame {
            jpeg,
            width: self.config.width,
            height: self.config.height,
        })
    }
}
