//! Video capture and frame sampling
//!
//! Sources stand in for a camera; the sampler turns whatever they show into
//! small JPEG stills for the broadcast bus and the narration endpoint.

pub mod sampler;
pub mod source;

pub use sampler::{EncodedFrame, FrameSampler, SamplerConfig, JPEG_MIME_TYPE};
pub use source::{StillImageSource, TestPatternSource, VideoInput, VideoSource, VideoSourceFactory};
