use super::chat::{compose_comment, ChatLog};
use super::config::SessionConfig;
use super::stats::AdminSnapshot;
use crate::bridge::CommentaryBridge;
use crate::bus::{BroadcastMessage, BusMember, ChatMessage};
use crate::error::{ChatError, StreamError, StreamResult};
use crate::video::{FrameSampler, VideoSource};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

struct AdminState {
    is_live: bool,
    /// Bumped on every start; a sampling tick only publishes for its own broadcast
    broadcast: u64,
    status: String,
    frames_sent: u64,
    chat: ChatLog,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// The broadcasting side: camera → bus, narration → local playback
pub struct AdminSession {
    /// Session configuration
    config: SessionConfig,

    /// Bus member used for frames, status and chat
    bus: Arc<dyn BusMember>,

    /// AI commentary bridge (shared with the sampling task)
    bridge: Arc<CommentaryBridge>,

    /// Camera stand-in
    video: Arc<Mutex<Box<dyn VideoSource>>>,

    /// When the session was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Live flag, status line, counters and chat
    state: Arc<Mutex<AdminState>>,

    /// Handle for the frame sampling task
    sampler_task: Mutex<Option<JoinHandle<()>>>,

    /// Handle for the bus listening task
    listener_task: Mutex<Option<JoinHandle<()>>>,
}

impl AdminSession {
    /// Create the session and start listening for viewer comments
    pub async fn new(
        config: SessionConfig,
        bus: Arc<dyn BusMember>,
        video: Box<dyn VideoSource>,
        bridge: CommentaryBridge,
    ) -> Result<Self> {
        info!("Creating admin session on topic {}", bus.topic());

        let mut subscription = bus
            .subscribe()
            .await
            .context("Failed to subscribe admin to the broadcast topic")?;

        let state = Arc::new(Mutex::new(AdminState {
            is_live: false,
            broadcast: 0,
            status: "Ready to start".to_string(),
            frames_sent: 0,
            chat: ChatLog::new(),
        }));

        let listener_state = Arc::clone(&state);
        let listener = tokio::spawn(async move {
            info!("Admin listener started");

            while let Some(message) = subscription.recv().await {
                match message {
                    BroadcastMessage::Comment { payload, .. } => {
                        debug!("Comment from {}", payload.user);
                        lock(&listener_state).chat.append(payload);
                    }
                    other => debug!("Admin ignoring {:?}", other.kind()),
                }
            }

            info!("Admin listener stopped");
        });

        Ok(Self {
            config,
            bus,
            bridge: Arc::new(bridge),
            video: Arc::new(Mutex::new(video)),
            started_at: Utc::now(),
            state,
            sampler_task: Mutex::new(None),
            listener_task: Mutex::new(Some(listener)),
        })
    }

    /// Acquire the camera, announce the broadcast and start sampling
    pub fn start_live(&self) -> StreamResult<()> {
        if lock(&self.state).is_live {
            warn!("Broadcast already live");
            return Ok(());
        }

        let started = {
            let mut video = lock(&self.video);
            info!("Starting video source: {}", video.name());
            video.start()
        };
        if let Err(e) = started {
            warn!("Camera unavailable: {:#}", e);
            lock(&self.state).status = "Camera unavailable. Check permissions.".to_string();
            return Err(StreamError::MediaAcquisition(e.to_string()));
        }

        let broadcast = {
            let mut state = lock(&self.state);
            state.is_live = true;
            state.broadcast += 1;
            state.frames_sent = 0;
            state.status = "LIVE - broadcasting".to_string();
            state.broadcast
        };

        self.bus.publish(BroadcastMessage::status(true));

        let sampler = FrameSampler::new(self.config.sampler);
        let period = self.config.frame_interval;
        let bus = Arc::clone(&self.bus);
        let bridge = Arc::clone(&self.bridge);
        let video = Arc::clone(&self.video);
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let sampled = {
                    let mut video = lock(&video);
                    sampler.sample_frame(video.as_mut())
                };

                let frame = match sampled {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!("Skipping frame: {:#}", e);
                        continue;
                    }
                };

                // Publish under the state lock so a frame can never follow the stop announcement
                let mut current = lock(&state);
                if !current.is_live || current.broadcast != broadcast {
                    debug!("Broadcast stopped mid-capture; dropping frame");
                    break;
                }
                bus.publish(BroadcastMessage::video_frame(frame.to_data_uri()));
                bridge.offer_frame(frame);
                current.frames_sent += 1;
            }
        });

        if let Some(previous) = lock(&self.sampler_task).replace(task) {
            previous.abort();
        }

        info!("Broadcast started ({}ms frame interval)", period.as_millis());

        Ok(())
    }

    /// Stop sampling, release the camera, announce the stop and force narration off
    pub fn stop_live(&self) {
        let was_live = {
            let mut state = lock(&self.state);
            let was_live = state.is_live;
            if was_live {
                state.is_live = false;
                state.status = "Broadcast stopped".to_string();
            }
            was_live
        };

        if let Some(task) = lock(&self.sampler_task).take() {
            task.abort();
        }
        lock(&self.video).stop();

        if !was_live {
            warn!("Broadcast not live");
            return;
        }

        self.bus.publish(BroadcastMessage::status(false));
        self.bridge.disable();

        info!("Broadcast stopped");
    }

    /// Turn AI narration on (only while live)
    pub async fn enable_narration(&self) -> StreamResult<()> {
        if !lock(&self.state).is_live {
            return Err(StreamError::NotLive);
        }
        self.bridge.enable().await
    }

    /// Turn AI narration off regardless of its current state
    pub fn disable_narration(&self) {
        self.bridge.disable();
    }

    /// Post a comment as the admin
    pub fn submit_comment(&self, user: &str, text: &str) -> Result<ChatMessage, ChatError> {
        let message = compose_comment(user, text)?;
        lock(&self.state).chat.append(message.clone());
        self.bus.publish(BroadcastMessage::comment(message.clone()));
        Ok(message)
    }

    pub fn is_live(&self) -> bool {
        lock(&self.state).is_live
    }

    pub fn bridge(&self) -> &CommentaryBridge {
        &self.bridge
    }

    pub fn chat_log(&self) -> Vec<ChatMessage> {
        lock(&self.state).chat.messages().to_vec()
    }

    pub fn snapshot(&self) -> AdminSnapshot {
        let narration = self.bridge.state();
        let state = lock(&self.state);

        AdminSnapshot {
            is_live: state.is_live,
            ai_enabled: narration.is_active(),
            narration,
            status: state.status.clone(),
            narration_status: self.bridge.status(),
            frames_sent: state.frames_sent,
            comments_count: state.chat.len(),
            started_at: self.started_at,
        }
    }
}

impl Drop for AdminSession {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.sampler_task).take() {
            task.abort();
        }
        if let Some(task) = lock(&self.listener_task).take() {
            task.abort();
        }
        lock(&self.video).stop();
        self.bridge.disable();
    }
}
