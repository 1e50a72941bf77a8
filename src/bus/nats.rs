use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use super::messages::BroadcastMessage;
use super::{BusMember, BusTransport, Subscription};

/// Messages waiting for the publisher task before new ones are dropped
const OUTBOUND_CAPACITY: usize = 16;

/// Same-host relay through a NATS server (default `nats://localhost:4222`)
///
/// Each member publishes on `<topic>.<member-id>` and subscribes to
/// `<topic>.*`, skipping its own subject.
pub struct NatsBus {
    url: String,
}

impl NatsBus {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// Connect a new member to the NATS server
    pub async fn connect_member(&self, topic: &str) -> Result<NatsMember> {
        info!("Connecting to NATS at {}", self.url);

        let client = async_nats::connect(self.url.as_str())
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        let id = uuid::Uuid::new_v4().simple().to_string();
        let subject = format!("{}.{}", topic, id);

        // Publishes go through one task so they leave in send order
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<BroadcastMessage>(OUTBOUND_CAPACITY);
        let publisher = client.clone();
        let publish_subject = subject.clone();
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let payload = match serde_json::to_vec(&message) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("Failed to serialize {:?}: {}", message.kind(), e);
                        continue;
                    }
                };

                if let Err(e) = publisher
                    .publish(publish_subject.clone(), payload.into())
                    .await
                {
                    warn!("Failed to publish to {}: {}", publish_subject, e);
                }
            }
            debug!("Publisher for {} finished", publish_subject);
        });

        Ok(NatsMember {
            client,
            id,
            topic: topic.to_string(),
            subject,
            outbound: outbound_tx,
        })
    }
}

#[async_trait::async_trait]
impl BusTransport for NatsBus {
    async fn join(&self, topic: &str) -> Result<Arc<dyn BusMember>> {
        Ok(Arc::new(self.connect_member(topic).await?))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Member connected through NATS
pub struct NatsMember {
    client: Client,
    id: String,
    topic: String,
    subject: String,
    outbound: mpsc::Sender<BroadcastMessage>,
}

#[async_trait::async_trait]
impl BusMember for NatsMember {
    fn id(&self) -> &str {
        &self.id
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn publish(&self, message: BroadcastMessage) {
        enqueue_outbound(&self.outbound, message, &self.subject);
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let wildcard = format!("{}.*", self.topic);

        info!("Subscribing to {}", wildcard);

        let subscriber = self
            .client
            .subscribe(wildcard.clone())
            .await
            .context("Failed to subscribe to broadcast topic")?;

        info!("Subscribed to {}", wildcard);

        Ok(Subscription::nats(
            self.id.clone(),
            self.subject.clone(),
            subscriber,
        ))
    }
}

/// Hand a message to the publisher task without waiting; returns false if it was dropped
fn enqueue_outbound(
    outbound: &mpsc::Sender<BroadcastMessage>,
    message: BroadcastMessage,
    subject: &str,
) -> bool {
    match outbound.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(message)) => {
            debug!(
                "Publisher for {} is behind; dropping {:?}",
                subject,
                message.kind()
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Publisher for {} already closed", subject);
            false
        }
    }
}

/// Wait for the next well-formed message not published on `own_subject`
pub(super) async fn next_message(
    subscriber: &mut async_nats::Subscriber,
    own_subject: &str,
) -> Option<BroadcastMessage> {
    while let Some(msg) = subscriber.next().await {
        let subject: &str = &msg.subject;
        if subject == own_subject {
            continue;
        }

        match serde_json::from_slice::<BroadcastMessage>(&msg.payload) {
            Ok(message) => return Some(message),
            Err(e) => {
                warn!("Failed to parse broadcast message on {}: {}", subject, e);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stalled_publisher_drops_instead_of_queueing() {
        let (outbound, mut pending) = mpsc::channel(OUTBOUND_CAPACITY);

        for _ in 0..OUTBOUND_CAPACITY {
            assert!(enqueue_outbound(
                &outbound,
                BroadcastMessage::video_frame("data:image/jpeg;base64,AAAA".to_string()),
                "stream.a"
            ));
        }

        // Queue is full: the next message is dropped without blocking the caller
        assert!(!enqueue_outbound(
            &outbound,
            BroadcastMessage::status(false),
            "stream.a"
        ));

        // Draining one slot makes room again
        assert!(pending.recv().await.is_some());
        assert!(enqueue_outbound(&outbound, BroadcastMessage::status(false), "stream.a"));

        drop(pending);
        assert!(!enqueue_outbound(&outbound, BroadcastMessage::status(true), "stream.a"));
    }
}
