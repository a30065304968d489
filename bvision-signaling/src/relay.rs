//! Signaling transports: in-memory relay and the backend HTTP/WebSocket relay

use crate::protocol::SignalingEnvelope;
use crate::transport::{PublishReceipt, RelayRouter, SignalingTransport, Subscription};
use async_trait::async_trait;
use bvision_api::WebRtcService;
use bvision_core::BVisionError;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};
use tungstenite::Message;

/// In-process relay: published envelopes are recorded, inbound envelopes are
/// injected with [`MemoryRelay::deliver`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRelay {
    router: RelayRouter,
    published: Arc<Mutex<Vec<SignalingEnvelope>>>,
    taps: Arc<Mutex<Vec<mpsc::UnboundedSender<SignalingEnvelope>>>>,
    reject: Arc<AtomicBool>,
}

impl MemoryRelay {
    /// Create an empty relay
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an inbound envelope to subscribers of its topic
    pub fn deliver(&self, envelope: SignalingEnvelope) -> usize {
        self.router.route(envelope)
    }

    /// Everything published so far, oldest first
    pub fn published(&self) -> Vec<SignalingEnvelope> {
        self.published.lock().clone()
    }

    /// Receive every envelope published from now on
    pub fn watch_published(&self) -> mpsc::UnboundedReceiver<SignalingEnvelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.taps.lock().push(tx);
        rx
    }

    /// Make subsequent publishes fail (or succeed again)
    pub fn fail_publishes(&self, fail: bool) {
        self.reject.store(fail, Ordering::SeqCst);
    }

    /// Live subscribers of `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.router.subscriber_count(topic)
    }
}

#[async_trait]
impl SignalingTransport for MemoryRelay {
    async fn publish(&self, envelope: &SignalingEnvelope) -> Result<PublishReceipt, BVisionError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(BVisionError::Relay {
                reason: format!("relay rejected message for {}", envelope.topic),
            });
        }
        let index = {
            let mut published = self.published.lock();
            published.push(envelope.clone());
            published.len()
        };
        self.taps
            .lock()
            .retain(|tap| tap.send(envelope.clone()).is_ok());
        Ok(PublishReceipt {
            message_id: Some(format!("mem-{}", index)),
        })
    }

    fn subscribe(&self, topic: &str) -> Subscription {
        self.router.subscribe(topic)
    }
}

/// Relay of the BVision backend: publishes through `POST /webrtc/message`
/// and receives envelopes as WebSocket text frames.
#[derive(Debug)]
pub struct HttpRelay {
    api: WebRtcService,
    router: RelayRouter,
    inbound: Mutex<Option<JoinHandle<()>>>,
}

impl HttpRelay {
    /// Create a relay publishing through `api`. Call
    /// [`HttpRelay::connect_inbound`] to start receiving.
    pub fn new(api: WebRtcService) -> Self {
        Self {
            api,
            router: RelayRouter::new(),
            inbound: Mutex::new(None),
        }
    }

    /// Router fed by the inbound connection
    pub fn router(&self) -> &RelayRouter {
        &self.router
    }

    /// Open the inbound WebSocket and route its frames. Replaces a previous
    /// inbound connection.
    pub async fn connect_inbound(&self, url: &str) -> Result<(), BVisionError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| BVisionError::Transport {
                reason: format!("Failed to connect to signaling relay {}: {}", url, e),
            })?;
        info!("Connected to signaling relay {}", url);

        let (_, read) = ws.split();
        let router = self.router.clone();
        let handle = tokio::spawn(async move {
            let routed = pump_inbound(read, router).await;
            info!("Signaling relay stream ended after {} envelopes", routed);
        });

        if let Some(previous) = self.inbound.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Stop the inbound connection, if any
    pub fn disconnect_inbound(&self) {
        if let Some(handle) = self.inbound.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for HttpRelay {
    fn drop(&mut self) {
        self.disconnect_inbound();
    }
}

#[async_trait]
impl SignalingTransport for HttpRelay {
    async fn publish(&self, envelope: &SignalingEnvelope) -> Result<PublishReceipt, BVisionError> {
        let res = self.api.send_message(envelope).await?;
        if !res.success {
            let reason = res
                .error
                .unwrap_or_else(|| "relay rejected the message".to_string());
            warn!("Relay rejected message for {}: {}", envelope.topic, reason);
            return Err(BVisionError::Relay { reason });
        }
        debug!(
            "Published {} to {}",
            envelope.payload().action,
            envelope.topic
        );
        Ok(PublishReceipt {
            message_id: res.message_id,
        })
    }

    fn subscribe(&self, topic: &str) -> Subscription {
        self.router.subscribe(topic)
    }
}

/// Route every text frame of `stream` until it closes or errors.
///
/// Frames that are not envelopes are logged and skipped. Returns how many
/// envelopes were routed.
pub async fn pump_inbound<S>(mut stream: S, router: RelayRouter) -> usize
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let mut routed = 0;
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    debug!("Skipping non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Signaling relay stream error: {}", e);
                break;
            }
        };

        match SignalingEnvelope::from_json(&text) {
            Ok(envelope) => {
                router.route(envelope);
                routed += 1;
            }
            Err(e) => debug!("Skipping frame that is not an envelope: {}", e),
        }
    }
    routed
}
