// Test doubles shared by the bridge, session and HTTP tests
#![allow(dead_code)]

use anyhow::Result;
use image::{Rgb, RgbImage};
use stagecast::audio::{AudioBlock, AudioClock, DiscardSink, MicrophoneSource, PlaybackScheduler};
use stagecast::bridge::{EndpointEvent, LiveConnection, LiveEndpoint, MediaChunk};
use stagecast::video::VideoSource;
use stagecast::{StreamError, StreamResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Await `future` for at most 200ms
pub async fn within<T>(future: impl Future<Output = T>) -> Option<T> {
    tokio::time::timeout(Duration::from_millis(200), future)
        .await
        .ok()
}

// ============================================================================
// Audio
// ============================================================================

#[derive(Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn at(now: f64) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap()
    }
}

pub fn scheduler_at(now: f64) -> Arc<Mutex<PlaybackScheduler>> {
    Arc::new(Mutex::new(PlaybackScheduler::new(
        ManualClock::at(now),
        Box::new(DiscardSink),
        24000,
    )))
}

/// Microphone whose blocks are pushed by the test
#[derive(Clone, Default)]
pub struct FakeMicrophone {
    pub sender: Arc<Mutex<Option<mpsc::Sender<AudioBlock>>>>,
    pub capturing: Arc<AtomicBool>,
    pub starts: Arc<AtomicUsize>,
    pub fail: bool,
}

impl FakeMicrophone {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    /// Push one block; false when capture is stopped
    pub async fn push(&self, samples: Vec<f32>) -> bool {
        let sender = self.sender.lock().unwrap().clone();
        match sender {
            Some(sender) => sender
                .send(AudioBlock {
                    samples,
                    sample_rate: 16000,
                    timestamp_ms: 0,
                })
                .await
                .is_ok(),
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl MicrophoneSource for FakeMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBlock>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("Permission denied");
        }
        let (tx, rx) = mpsc::channel(16);
        *self.sender.lock().unwrap() = Some(tx);
        self.capturing.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    fn stop(&mut self) {
        self.sender.lock().unwrap().take();
        self.capturing.store(false, Ordering::SeqCst);
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Live endpoint
// ============================================================================

/// Endpoint that records outbound chunks and lets the test raise events
#[derive(Clone, Default)]
pub struct FakeEndpoint {
    pub sent: Arc<Mutex<Vec<MediaChunk>>>,
    pub events: Arc<Mutex<Option<mpsc::UnboundedSender<EndpointEvent>>>>,
    pub closed: Arc<AtomicBool>,
    pub connects: Arc<AtomicUsize>,
    /// Error returned from connect
    pub refuse: Option<StreamError>,
    /// Raise `Opened` as soon as the session is created
    pub open_immediately: bool,
}

impl FakeEndpoint {
    pub fn opening() -> Self {
        Self {
            open_immediately: true,
            ..Self::default()
        }
    }

    pub fn refusing(error: StreamError) -> Self {
        Self {
            refuse: Some(error),
            ..Self::default()
        }
    }

    pub fn raise(&self, event: EndpointEvent) -> bool {
        match self.events.lock().unwrap().as_ref() {
            Some(events) => events.send(event).is_ok(),
            None => false,
        }
    }

    pub fn sent(&self) -> Vec<MediaChunk> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LiveEndpoint for FakeEndpoint {
    async fn connect(
        &self,
        events: mpsc::UnboundedSender<EndpointEvent>,
    ) -> StreamResult<Box<dyn LiveConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.refuse.clone() {
            return Err(error);
        }

        self.closed.store(false, Ordering::SeqCst);
        if self.open_immediately {
            let _ = events.send(EndpointEvent::Opened);
        }
        *self.events.lock().unwrap() = Some(events);

        Ok(Box::new(FakeConnection {
            sent: Arc::clone(&self.sent),
            closed: Arc::clone(&self.closed),
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeConnection {
    sent: Arc<Mutex<Vec<MediaChunk>>>,
    closed: Arc<AtomicBool>,
}

impl LiveConnection for FakeConnection {
    fn send(&self, chunk: MediaChunk) -> StreamResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StreamError::EndpointConnection("closed".to_string()));
        }
        self.sent.lock().unwrap().push(chunk);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// Video
// ============================================================================

/// Solid-colour camera that can be told to refuse access
#[derive(Clone, Default)]
pub struct FakeCamera {
    pub running: Arc<AtomicBool>,
    pub deny: bool,
    /// Time each capture blocks for
    pub capture_delay: Duration,
}

impl FakeCamera {
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    pub fn slow(capture_delay: Duration) -> Self {
        Self {
            capture_delay,
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl VideoSource for FakeCamera {
    fn start(&mut self) -> Result<()> {
        if self.deny {
            anyhow::bail!("NotAllowedError: Permission denied");
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn capture(&mut self) -> Result<RgbImage> {
        if !self.is_running() {
            anyhow::bail!("camera not started");
        }
        if !self.capture_delay.is_zero() {
            std::thread::sleep(self.capture_delay);
        }
        Ok(RgbImage::from_pixel(64, 48, Rgb([200, 30, 30])))
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "fake-camera"
    }
}
