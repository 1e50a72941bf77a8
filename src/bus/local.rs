use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::messages::BroadcastMessage;
use super::{BusMember, BusTransport, Subscription};

/// Per-topic channel capacity; beyond this a slow subscriber starts losing messages
const TOPIC_CAPACITY: usize = 16;

/// A message tagged with the member that published it
#[derive(Debug, Clone)]
pub struct LocalEnvelope {
    origin: Arc<str>,
    message: Arc<BroadcastMessage>,
}

/// In-process bus: every member of a topic shares one broadcast channel
#[derive(Clone)]
pub struct LocalHub {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<LocalEnvelope>>>>,
    capacity: usize,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::with_capacity(TOPIC_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Join synchronously (the local transport never waits)
    pub fn member(&self, topic: &str) -> LocalMember {
        let sender = {
            let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
            topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .clone()
        };

        let id = uuid::Uuid::new_v4().simple().to_string();
        debug!("Member {} joined local topic {}", id, topic);

        LocalMember {
            id: Arc::from(id.as_str()),
            topic: topic.to_string(),
            sender,
        }
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BusTransport for LocalHub {
    async fn join(&self, topic: &str) -> Result<Arc<dyn BusMember>> {
        Ok(Arc::new(self.member(topic)))
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Member of an in-process topic
pub struct LocalMember {
    id: Arc<str>,
    topic: String,
    sender: broadcast::Sender<LocalEnvelope>,
}

#[async_trait::async_trait]
impl BusMember for LocalMember {
    fn id(&self) -> &str {
        &self.id
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn publish(&self, message: BroadcastMessage) {
        let kind = message.kind();
        let envelope = LocalEnvelope {
            origin: Arc::clone(&self.id),
            message: Arc::new(message),
        };

        // Err only means nobody is subscribed
        if self.sender.send(envelope).is_err() {
            debug!("No subscribers on {} for {:?}", self.topic, kind);
        }
    }

    async fn subscribe(&self) -> Result<Subscription> {
        info!("Member {} subscribed to local topic {}", self.id, self.topic);
        Ok(Subscription::local(
            self.id.to_string(),
            self.sender.subscribe(),
        ))
    }
}

/// Wait for the next message not published by `member_id`
pub(super) async fn next_message(
    receiver: &mut broadcast::Receiver<LocalEnvelope>,
    member_id: &str,
) -> Option<BroadcastMessage> {
    loop {
        match receiver.recv().await {
            Ok(envelope) if &*envelope.origin == member_id => continue,
            Ok(envelope) => return Some((*envelope.message).clone()),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Subscriber {} lagged, dropped {} messages", member_id, skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
