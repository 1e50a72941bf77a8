//! Decoded audio segments and the rates of both audio directions
//!
//! Narration replies decode into [`AudioSegment`]s at 24 kHz; microphone audio
//! is captured at 16 kHz.

use super::pcm::{decode_pcm16, from_transport_text};
use crate::error::DecodeError;

/// Sample rate of narration audio returned by the endpoint
pub const NARRATION_SAMPLE_RATE: u32 = 24000;

/// Sample rate of microphone audio sent to the endpoint
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// A decoded block of mono PCM, ready to be scheduled
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    /// Normalized samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Silent segment lasting `duration_secs`, rounded down to whole samples
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let count = (duration_secs * sample_rate as f64) as usize;
        Self::new(vec![0.0; count], sample_rate)
    }

    /// Decode base64 PCM16 text into a segment.
    ///
    /// Odd byte counts are treated as malformed rather than truncated.
    pub fn from_transport_text(text: &str, sample_rate: u32) -> Result<Self, DecodeError> {
        let bytes = from_transport_text(text)?;
        if bytes.len() % 2 != 0 {
            return Err(DecodeError::OddLength(bytes.len()));
        }

        Ok(Self::new(decode_pcm16(&bytes), sample_rate))
    }

    /// Duration in seconds (`sample_count / sample_rate`)
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
