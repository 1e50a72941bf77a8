use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::endpoint::{EndpointEvent, LiveConnection, LiveEndpoint, MediaChunk};
use crate::audio::{AudioBlock, MicrophoneSource, PlaybackScheduler};
use crate::error::{StreamError, StreamResult};
use crate::video::EncodedFrame;

/// Narration lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    Disabled,
    Connecting,
    Connected,
    Closed,
    Failed,
}

impl BridgeState {
    /// Connecting or connected
    pub fn is_active(self) -> bool {
        matches!(self, BridgeState::Connecting | BridgeState::Connected)
    }
}

/// Bridge tunables
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How often the latest sampled frame is forwarded to the endpoint
    pub frame_forward_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            frame_forward_interval: Duration::from_secs(1),
        }
    }
}

struct BridgeInner {
    state: BridgeState,
    status: String,
    /// Bumped on every enable/disable; stale tasks and connects compare against it
    generation: u64,
    /// `None` only while `enable` is awaiting the microphone
    microphone: Option<Box<dyn MicrophoneSource>>,
    connection: Option<Arc<dyn LiveConnection>>,
    tasks: Vec<JoinHandle<()>>,
    latest_frame: Option<EncodedFrame>,
}

impl BridgeInner {
    /// Abort pumps, close the session, stop the microphone
    fn release(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        if let Some(microphone) = self.microphone.as_mut() {
            microphone.stop();
        }
        self.latest_frame = None;
    }

    fn connected(&self, generation: u64) -> bool {
        self.generation == generation && self.state == BridgeState::Connected
    }
}

type Shared = Arc<Mutex<BridgeInner>>;

fn lock(shared: &Shared) -> MutexGuard<'_, BridgeInner> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// Adapts local capture to the live endpoint and its audio replies to the
/// playback scheduler.
///
/// At most one endpoint session exists per bridge. Disabling is synchronous:
/// the microphone, the connection and every pump task are released before
/// `disable` returns, without waiting for the endpoint.
pub struct CommentaryBridge {
    config: BridgeConfig,
    endpoint: Arc<dyn LiveEndpoint>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    shared: Shared,
}

impl CommentaryBridge {
    pub fn new(
        config: BridgeConfig,
        endpoint: Arc<dyn LiveEndpoint>,
        microphone: Box<dyn MicrophoneSource>,
        scheduler: Arc<Mutex<PlaybackScheduler>>,
    ) -> Self {
        Self {
            config,
            endpoint,
            scheduler,
            shared: Arc::new(Mutex::new(BridgeInner {
                state: BridgeState::Disabled,
                status: "AI narrator off".to_string(),
                generation: 0,
                microphone: Some(microphone),
                connection: None,
                tasks: Vec::new(),
                latest_frame: None,
            })),
        }
    }

    pub fn state(&self) -> BridgeState {
        lock(&self.shared).state
    }

    /// Short user-facing status line
    pub fn status(&self) -> String {
        lock(&self.shared).status.clone()
    }

    pub fn scheduler(&self) -> Arc<Mutex<PlaybackScheduler>> {
        Arc::clone(&self.scheduler)
    }

    /// Acquire the microphone and open the endpoint session
    pub async fn enable(&self) -> StreamResult<()> {
        let (generation, mut microphone) = {
            let mut inner = lock(&self.shared);
            if inner.state.is_active() {
                warn!("AI narration already enabled");
                return Ok(());
            }

            let Some(microphone) = inner.microphone.take() else {
                return Err(StreamError::MediaAcquisition(
                    "microphone is busy".to_string(),
                ));
            };

            inner.generation += 1;
            inner.state = BridgeState::Connecting;
            inner.status = "Connecting to AI narrator...".to_string();
            (inner.generation, microphone)
        };

        info!(
            "Enabling AI narration via {} (microphone: {})",
            self.endpoint.name(),
            microphone.name()
        );

        let started = microphone.start().await;

        let mic_rx = {
            let mut inner = lock(&self.shared);
            match started {
                Err(e) => {
                    microphone.stop();
                    inner.microphone = Some(microphone);
                    if inner.generation != generation {
                        return Ok(());
                    }
                    error!("Microphone acquisition failed: {:#}", e);
                    inner.state = BridgeState::Failed;
                    inner.status = "AI narrator error: microphone unavailable".to_string();
                    return Err(StreamError::MediaAcquisition(e.to_string()));
                }
                Ok(rx) => {
                    if inner.generation != generation {
                        microphone.stop();
                        inner.microphone = Some(microphone);
                        debug!("Narration disabled while the microphone was starting");
                        return Ok(());
                    }
                    inner.microphone = Some(microphone);
                    rx
                }
            }
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let connection: Arc<dyn LiveConnection> = match self.endpoint.connect(event_tx).await {
            Ok(connection) => Arc::from(connection),
            Err(e) => {
                let mut inner = lock(&self.shared);
                if inner.generation == generation {
                    error!("Narrator connection failed: {}", e);
                    inner.release();
                    inner.state = BridgeState::Failed;
                    inner.status = failure_status(&e);
                }
                return Err(e);
            }
        };

        let mut inner = lock(&self.shared);
        if inner.generation != generation {
            debug!("Narration disabled while connecting; closing late session");
            connection.close();
            return Ok(());
        }

        inner.connection = Some(Arc::clone(&connection));
        inner.tasks = vec![
            tokio::spawn(pump_microphone(
                mic_rx,
                Arc::clone(&connection),
                Arc::clone(&self.shared),
                generation,
            )),
            tokio::spawn(forward_frames(
                self.config.frame_forward_interval,
                Arc::clone(&connection),
                Arc::clone(&self.shared),
                generation,
            )),
            tokio::spawn(pump_events(
                event_rx,
                Arc::clone(&self.scheduler),
                Arc::clone(&self.shared),
                generation,
            )),
        ];

        Ok(())
    }

    /// Force narration off. Scheduled audio keeps playing.
    pub fn disable(&self) {
        let mut inner = lock(&self.shared);
        inner.generation += 1;
        let was_active = inner.state.is_active();
        inner.release();

        if inner.state != BridgeState::Disabled {
            inner.state = BridgeState::Closed;
            inner.status = "AI narrator off".to_string();
        }
        if was_active {
            info!("AI narration disabled");
        }
    }

    /// Latest sampled frame; the forwarding ticker picks it up
    pub fn offer_frame(&self, frame: EncodedFrame) {
        let mut inner = lock(&self.shared);
        if inner.state.is_active() {
            inner.latest_frame = Some(frame);
        }
    }
}

impl Drop for CommentaryBridge {
    fn drop(&mut self) {
        lock(&self.shared).release();
    }
}

fn failure_status(error: &StreamError) -> String {
    match error {
        StreamError::Configuration(_) => "AI narrator error: not configured".to_string(),
        StreamError::MediaAcquisition(_) => "AI narrator error: microphone unavailable".to_string(),
        _ => "AI narrator error".to_string(),
    }
}

async fn pump_microphone(
    mut mic_rx: mpsc::Receiver<AudioBlock>,
    connection: Arc<dyn LiveConnection>,
    shared: Shared,
    generation: u64,
) {
    while let Some(block) = mic_rx.recv().await {
        if !lock(&shared).connected(generation) {
            continue;
        }

        if let Err(e) = connection.send(MediaChunk::audio(&block.samples)) {
            debug!("Dropped microphone block at {}ms: {}", block.timestamp_ms, e);
        }
    }

    debug!("Microphone pump finished");
}

async fn forward_frames(
    period: Duration,
    connection: Arc<dyn LiveConnection>,
    shared: Shared,
    generation: u64,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let frame = {
            let mut inner = lock(&shared);
            if !inner.connected(generation) {
                continue;
            }
            inner.latest_frame.take()
        };

        if let Some(frame) = frame {
            if let Err(e) = connection.send(MediaChunk::image(&frame)) {
                debug!("Dropped frame for narrator: {}", e);
            }
        }
    }
}

async fn pump_events(
    mut event_rx: mpsc::UnboundedReceiver<EndpointEvent>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    shared: Shared,
    generation: u64,
) {
    while let Some(event) = event_rx.recv().await {
        match event {
            EndpointEvent::Opened => {
                let mut inner = lock(&shared);
                if inner.generation == generation && inner.state == BridgeState::Connecting {
                    inner.state = BridgeState::Connected;
                    inner.status = "AI narrator connected and watching".to_string();
                    info!("AI narrator connected");
                }
            }
            EndpointEvent::AudioReceived(data) => {
                let mut playback = scheduler.lock().unwrap_or_else(|e| e.into_inner());
                playback.play_encoded(&data);
            }
            EndpointEvent::Closed => {
                let mut inner = lock(&shared);
                if inner.generation == generation {
                    info!("AI narrator closed the session");
                    inner.release();
                    inner.state = BridgeState::Closed;
                    inner.status = "AI narrator disconnected".to_string();
                }
                break;
            }
            EndpointEvent::Failed(reason) => {
                let mut inner = lock(&shared);
                if inner.generation == generation {
                    error!("AI narrator failed: {}", reason);
                    inner.release();
                    inner.state = BridgeState::Failed;
                    inner.status = "AI narrator error".to_string();
                }
                break;
            }
        }
    }
}
