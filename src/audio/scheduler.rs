//! Playback scheduler for narration audio
//!
//! Segments arrive whenever the endpoint produces them, with arbitrary sizes
//! and jitter. Each one is placed on the audio clock directly after the
//! previous one, or at "now" if the previous one has already finished, so
//! playback never overlaps and never leaves a gap caused by late scheduling.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::segment::AudioSegment;
use super::sink::AudioSink;

/// Source of the output device's notion of "now", in seconds
pub trait AudioClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Monotonic clock that starts at zero when created
#[derive(Debug, Clone)]
pub struct SystemAudioClock {
    origin: Instant,
}

impl SystemAudioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemAudioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemAudioClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Where a segment landed on the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledSegment {
    pub start_time: f64,
    pub duration: f64,
}

impl ScheduledSegment {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Gapless, overlap-free scheduler over an [`AudioSink`]
pub struct PlaybackScheduler {
    clock: Arc<dyn AudioClock>,
    sink: Box<dyn AudioSink>,
    /// Audio-clock time before which no new segment may start
    next_start_time: f64,
    /// Rate used to decode inbound transport text
    sample_rate: u32,
}

impl PlaybackScheduler {
    pub fn new(clock: Arc<dyn AudioClock>, sink: Box<dyn AudioSink>, sample_rate: u32) -> Self {
        Self {
            clock,
            sink,
            next_start_time: 0.0,
            sample_rate,
        }
    }

    /// Current cursor position
    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    /// Schedule `segment` no earlier than `clock_now` and no earlier than the
    /// end of the previously scheduled segment.
    pub fn enqueue(&mut self, segment: AudioSegment, clock_now: f64) -> ScheduledSegment {
        let start_time = clock_now.max(self.next_start_time);
        let duration = segment.duration();

        if let Err(e) = self.sink.schedule(segment, start_time) {
            warn!("Audio sink rejected segment at {:.3}s: {}", start_time, e);
        }

        self.next_start_time = start_time + duration;

        debug!(
            "Scheduled {:.3}s segment at {:.3}s (cursor now {:.3}s)",
            duration, start_time, self.next_start_time
        );

        ScheduledSegment {
            start_time,
            duration,
        }
    }

    /// Schedule against the scheduler's own clock
    pub fn play(&mut self, segment: AudioSegment) -> ScheduledSegment {
        let now = self.clock.now();
        self.enqueue(segment, now)
    }

    /// Decode base64 PCM16 and schedule it.
    ///
    /// Malformed payloads are dropped and leave the cursor untouched.
    pub fn play_encoded(&mut self, text: &str) -> Option<ScheduledSegment> {
        match AudioSegment::from_transport_text(text, self.sample_rate) {
            Ok(segment) => Some(self.play(segment)),
            Err(e) => {
                debug!("Dropping undecodable audio segment: {}", e);
                None
            }
        }
    }
}
