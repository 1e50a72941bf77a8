//! 16-bit PCM and transport-text conversions
//!
//! Outbound microphone audio is normalized `f32` that has to become signed
//! 16-bit little-endian PCM; inbound narration arrives as base64 text carrying
//! the same format. Everything here is pure.

use base64::Engine;

use crate::error::DecodeError;

/// Convert normalized samples to signed 16-bit PCM.
///
/// Samples are clamped to [-1, 1]; negative values scale by 32768 and
/// non-negative values by 32767 so both ends of the i16 range are reachable.
pub fn encode_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = if s.is_nan() { 0.0 } else { s.clamp(-1.0, 1.0) };
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect()
}

/// Serialize samples as little-endian bytes
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode little-endian 16-bit PCM into normalized samples.
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect()
}

/// Encode binary data as standard base64
pub fn to_transport_text(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode standard base64 back into bytes
pub fn from_transport_text(text: &str) -> Result<Vec<u8>, DecodeError> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| DecodeError::TransportText(e.to_string()))
}

/// Microphone block → base64 PCM16, the shape the narration endpoint expects
pub fn samples_to_transport_text(samples: &[f32]) -> String {
    to_transport_text(&pcm16_to_bytes(&encode_pcm16(samples)))
}
