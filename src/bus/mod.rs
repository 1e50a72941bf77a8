//! Broadcast bus
//!
//! One logical topic shared by the admin and every viewer. Semantics are the
//! same for both transports:
//! - publishing is fire-and-forget and never delivers back to the publisher
//! - subscribers only see messages published after they subscribed
//! - delivery is at-most-once; a lagging subscriber loses messages
//! - order is preserved per publisher, never across publishers
//!
//! Transports:
//! - [`LocalHub`]: in-process, tokio broadcast channels
//! - [`NatsBus`]: same-host relay through a local NATS server

pub mod local;
pub mod messages;
pub mod nats;

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

pub use local::{LocalHub, LocalMember};
pub use messages::{now_millis, BroadcastMessage, ChatMessage, MessageKind};
pub use nats::{NatsBus, NatsMember};

/// Topic used when none is configured
pub const DEFAULT_TOPIC: &str = "easp_2025_stream";

/// Creates bus members
#[async_trait::async_trait]
pub trait BusTransport: Send + Sync {
    /// Join `topic` as a new member with a fresh id
    async fn join(&self, topic: &str) -> Result<Arc<dyn BusMember>>;

    /// Transport name for logging
    fn name(&self) -> &str;
}

/// One participant on a topic
#[async_trait::async_trait]
pub trait BusMember: Send + Sync {
    /// Unique member id
    fn id(&self) -> &str;

    fn topic(&self) -> &str;

    /// Deliver to every other subscribed member. Never blocks, never fails.
    fn publish(&self, message: BroadcastMessage);

    /// Start receiving messages published by other members from now on
    async fn subscribe(&self) -> Result<Subscription>;
}

/// Pick the bus transport named in configuration
pub async fn create_transport(kind: &str, nats_url: &str) -> Result<Arc<dyn BusTransport>> {
    match kind {
        "local" => Ok(Arc::new(LocalHub::new())),
        "nats" => Ok(Arc::new(NatsBus::new(nats_url))),
        other => anyhow::bail!("Unknown bus transport: {}", other),
    }
}

enum SubscriptionInner {
    Local(tokio::sync::broadcast::Receiver<local::LocalEnvelope>),
    Nats(async_nats::Subscriber),
}

/// Live registration on a topic; dropping it stops delivery
pub struct Subscription {
    member_id: String,
    own_subject: String,
    inner: Option<SubscriptionInner>,
}

impl Subscription {
    pub(crate) fn local(
        member_id: String,
        receiver: tokio::sync::broadcast::Receiver<local::LocalEnvelope>,
    ) -> Self {
        Self {
            member_id,
            own_subject: String::new(),
            inner: Some(SubscriptionInner::Local(receiver)),
        }
    }

    pub(crate) fn nats(
        member_id: String,
        own_subject: String,
        subscriber: async_nats::Subscriber,
    ) -> Self {
        Self {
            member_id,
            own_subject,
            inner: Some(SubscriptionInner::Nats(subscriber)),
        }
    }

    /// Next message from another member; `None` once unsubscribed or the
    /// transport has gone away
    pub async fn recv(&mut self) -> Option<BroadcastMessage> {
        let next = match self.inner.as_mut() {
            None => return None,
            Some(SubscriptionInner::Local(receiver)) => {
                local::next_message(receiver, &self.member_id).await
            }
            Some(SubscriptionInner::Nats(subscriber)) => {
                nats::next_message(subscriber, &self.own_subject).await
            }
        };

        if next.is_none() {
            self.inner = None;
        }
        next
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Stop delivery and release the topic registration. Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.inner.take().is_some() {
            debug!("Member {} unsubscribed", self.member_id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
