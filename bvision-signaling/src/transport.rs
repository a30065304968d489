//! Signaling transport abstraction and topic routing

use crate::protocol::SignalingEnvelope;
use async_trait::async_trait;
use bvision_core::BVisionError;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Acknowledgement of a published message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Relay-assigned message id, when the relay returns one
    pub message_id: Option<String>,
}

/// Message relay shared by all sessions, multiplexed by topic
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Send an envelope to its topic
    async fn publish(&self, envelope: &SignalingEnvelope) -> Result<PublishReceipt, BVisionError>;

    /// Start receiving envelopes for `topic`. Dropping the subscription
    /// stops delivery.
    fn subscribe(&self, topic: &str) -> Subscription;
}

type Subscribers = Vec<(Uuid, mpsc::UnboundedSender<SignalingEnvelope>)>;

/// Fan-out of inbound envelopes to topic subscribers
#[derive(Debug, Clone, Default)]
pub struct RelayRouter {
    topics: Arc<DashMap<String, Subscribers>>,
}

impl RelayRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for `topic`
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.topics
            .entry(topic.to_string())
            .or_default()
            .push((id, tx));
        debug!("Subscribed {} to {}", id, topic);
        Subscription {
            receiver: rx,
            guard: SubscriptionGuard {
                id,
                topic: topic.to_string(),
                router: self.clone(),
            },
        }
    }

    /// Deliver an envelope to every subscriber of its topic.
    ///
    /// Returns how many subscribers received it.
    pub fn route(&self, envelope: SignalingEnvelope) -> usize {
        let Some(mut subscribers) = self.topics.get_mut(&envelope.topic) else {
            debug!("No subscriber for topic {}", envelope.topic);
            return 0;
        };
        subscribers.retain(|(_, tx)| !tx.is_closed());
        let mut delivered = 0;
        for (_, tx) in subscribers.iter() {
            if tx.send(envelope.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Live subscribers of `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map(|s| s.len()).unwrap_or(0)
    }

    fn unsubscribe(&self, topic: &str, id: Uuid) {
        let emptied = match self.topics.get_mut(topic) {
            Some(mut subscribers) => {
                subscribers.retain(|(sub_id, _)| *sub_id != id);
                subscribers.is_empty()
            }
            None => false,
        };
        if emptied {
            self.topics.remove_if(topic, |_, subscribers| subscribers.is_empty());
        }
        debug!("Unsubscribed {} from {}", id, topic);
    }
}

/// Inbound envelopes for one topic
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<SignalingEnvelope>,
    guard: SubscriptionGuard,
}

impl Subscription {
    /// Topic this subscription listens on
    pub fn topic(&self) -> &str {
        self.guard.topic()
    }

    /// Next envelope, or `None` once the subscription is released
    pub async fn recv(&mut self) -> Option<SignalingEnvelope> {
        self.receiver.recv().await
    }

    /// Next envelope if one is already queued
    pub fn try_recv(&mut self) -> Option<SignalingEnvelope> {
        self.receiver.try_recv().ok()
    }

    /// Separate the registration from the receiving end. Dropping the guard
    /// unsubscribes at once, wherever the receiver lives.
    pub fn into_parts(self) -> (SubscriptionGuard, mpsc::UnboundedReceiver<SignalingEnvelope>) {
        (self.guard, self.receiver)
    }
}

/// Registration of a subscriber; unsubscribes on drop
#[derive(Debug)]
pub struct SubscriptionGuard {
    id: Uuid,
    topic: String,
    router: RelayRouter,
}

impl SubscriptionGuard {
    /// Subscribed topic
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.router.unsubscribe(&self.topic, self.id);
    }
}
