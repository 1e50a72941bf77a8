use super::chat::{compose_comment, ChatLog};
use super::stats::ViewerSnapshot;
use crate::bus::{BroadcastMessage, BusMember, ChatMessage};
use crate::error::ChatError;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const WAITING_TO_START: &str = "Waiting for the broadcast to start...";
const BROADCAST_ENDED: &str = "The broadcast has ended.";

/// What a viewer currently shows
#[derive(Debug, Clone)]
pub struct ViewerState {
    pub is_live: bool,
    pub frame: Option<String>,
    pub waiting_message: String,
    pub frames_received: u64,
    pub chat: ChatLog,
}

impl ViewerState {
    pub fn new() -> Self {
        Self {
            is_live: false,
            frame: None,
            waiting_message: WAITING_TO_START.to_string(),
            frames_received: 0,
            chat: ChatLog::new(),
        }
    }

    /// Mirror one bus message
    pub fn apply(&mut self, message: BroadcastMessage) {
        match message {
            BroadcastMessage::VideoFrame { payload, .. } => {
                self.frame = Some(payload);
                self.is_live = true;
                self.frames_received += 1;
            }
            BroadcastMessage::StatusUpdate { live, .. } => {
                self.is_live = live;
                if !live {
                    self.frame = None;
                    self.waiting_message = BROADCAST_ENDED.to_string();
                }
            }
            BroadcastMessage::Comment { payload, .. } => {
                self.chat.append(payload);
            }
        }
    }
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A watching member of the broadcast topic
pub struct ViewerSession {
    bus: Arc<dyn BusMember>,
    state: Arc<Mutex<ViewerState>>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
}

impl ViewerSession {
    /// Subscribe and start mirroring the broadcast
    pub async fn join(bus: Arc<dyn BusMember>) -> Result<Self> {
        let mut subscription = bus
            .subscribe()
            .await
            .context("Failed to subscribe viewer to the broadcast topic")?;

        info!("Viewer {} joined {}", bus.id(), bus.topic());

        let state = Arc::new(Mutex::new(ViewerState::new()));
        let listener_state = Arc::clone(&state);
        let viewer_id = bus.id().to_string();

        let listener = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                debug!("Viewer {} received {:?}", viewer_id, message.kind());
                lock(&listener_state).apply(message);
            }
            debug!("Viewer {} listener stopped", viewer_id);
        });

        Ok(Self {
            bus,
            state,
            listener_task: Mutex::new(Some(listener)),
        })
    }

    pub fn id(&self) -> &str {
        self.bus.id()
    }

    /// Post a comment. Rejected comments are neither published nor logged.
    pub fn submit_comment(&self, user: &str, text: &str) -> Result<ChatMessage, ChatError> {
        let message = compose_comment(user, text)?;
        lock(&self.state).chat.append(message.clone());
        self.bus.publish(BroadcastMessage::comment(message.clone()));
        Ok(message)
    }

    pub fn chat_log(&self) -> Vec<ChatMessage> {
        lock(&self.state).chat.messages().to_vec()
    }

    pub fn state(&self) -> ViewerState {
        lock(&self.state).clone()
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        let state = lock(&self.state);
        ViewerSnapshot {
            viewer_id: self.id().to_string(),
            is_live: state.is_live,
            frame: if state.is_live { state.frame.clone() } else { None },
            waiting_message: state.waiting_message.clone(),
            frames_received: state.frames_received,
            comments_count: state.chat.len(),
        }
    }

    /// Stop receiving. Idempotent.
    pub fn leave(&self) {
        if let Some(task) = lock(&self.listener_task).take() {
            task.abort();
            info!("Viewer {} left", self.id());
        }
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.leave();
    }
}
