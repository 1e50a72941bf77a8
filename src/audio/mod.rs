pub mod microphone;
pub mod pcm;
pub mod scheduler;
pub mod segment;
pub mod sink;

pub use microphone::{
    AudioBlock, MicrophoneFactory, MicrophoneInput, MicrophoneSource, UnavailableMicrophone,
    WavFileMicrophone,
};
pub use scheduler::{AudioClock, PlaybackScheduler, ScheduledSegment, SystemAudioClock};
pub use segment::{AudioSegment, CAPTURE_SAMPLE_RATE, NARRATION_SAMPLE_RATE};
pub use sink::{AudioSink, DiscardSink, WavTimelineSink};
