//! Stream Session Manager
//!
//! Negotiates and supervises the media session of one live-view tile:
//! creates the offer, sends it to the device through the relay, applies the
//! answer and trickled candidates, and tears everything down on `stop()`.
//!
//! All mutable state sits behind one `parking_lot::Mutex` that is never held
//! across an `.await`. Each live session owns a listener task that drains
//! inbound envelopes and peer callbacks one at a time.

use crate::peer::{
    IceCandidateInit, MediaTrack, NullSurface, OfferOptions, PeerConnection,
    PeerConnectionFactory, PeerConnectionState, PeerEvent, RtcConfiguration, VideoSurface,
};
use crate::protocol::{
    decode_candidate, decode_description, topic, SessionId, SignalingAction, SignalingEnvelope,
};
use crate::transport::{SignalingTransport, SubscriptionGuard};
use bvision_core::{BVisionError, Device};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Notifications for the hosting UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The connection state changed
    StateChanged {
        /// Device of the session
        device_key: String,
        /// New state
        state: PeerConnectionState,
    },
    /// Remote media was attached to the tile
    MediaAttached {
        /// Device of the session
        device_key: String,
        /// The attached track
        track: MediaTrack,
    },
    /// Negotiation, transport or decode failure
    Error {
        /// Device of the session
        device_key: String,
        /// Error code, see [`BVisionError::error_code`]
        code: String,
        /// Human readable message
        message: String,
    },
}

impl SessionEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::MediaAttached { .. } => "media_attached",
            SessionEvent::Error { .. } => "error",
        }
    }

    /// Device the event concerns
    pub fn device_key(&self) -> &str {
        match self {
            SessionEvent::StateChanged { device_key, .. }
            | SessionEvent::MediaAttached { device_key, .. }
            | SessionEvent::Error { device_key, .. } => device_key,
        }
    }
}

/// Lifecycle phase of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No session
    Idle,
    /// `start()` in progress
    Starting,
    /// Offer sent, listener running
    Active,
}

/// Why an inbound envelope was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No session has been started, or it was stopped
    NoSession,
    /// `session_id` does not match the live session
    StaleSession,
    /// Addressed to another device
    ForeignDevice,
    /// Action a viewer never receives
    UnexpectedAction,
    /// An answer was already applied
    DuplicateAnswer,
}

/// Result of [`StreamSessionManager::handle_inbound`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Applied to the peer connection
    Applied,
    /// Candidate queued until the answer is applied
    Buffered,
    /// Dropped
    Ignored(IgnoreReason),
}

/// Point-in-time view of a manager
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Device of the current or last session
    pub device_key: Option<String>,
    /// Live session id
    pub session_id: Option<SessionId>,
    /// Lifecycle phase
    pub phase: SessionPhase,
    /// Last known connection state
    pub state: PeerConnectionState,
    /// When the current session was started
    pub started_at: Option<DateTime<Utc>>,
    /// Remote candidates waiting for the answer
    pub pending_remote_candidates: usize,
}

/// Builder for [`StreamSessionManager`]
pub struct SessionBuilder {
    transport: Option<Arc<dyn SignalingTransport>>,
    factory: Option<Arc<dyn PeerConnectionFactory>>,
    rtc_config: RtcConfiguration,
    surface: Arc<dyn VideoSurface>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            factory: None,
            rtc_config: RtcConfiguration::default(),
            surface: Arc::new(NullSurface),
            events: None,
        }
    }
}

impl SessionBuilder {
    /// Start with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signaling transport (required)
    pub fn transport(mut self, transport: Arc<dyn SignalingTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the peer connection factory (required)
    pub fn peer_factory(mut self, factory: Arc<dyn PeerConnectionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Peer connection configuration
    pub fn rtc_config(mut self, config: RtcConfiguration) -> Self {
        self.rtc_config = config;
        self
    }

    /// Surface remote media is attached to
    pub fn surface(mut self, surface: Arc<dyn VideoSurface>) -> Self {
        self.surface = surface;
        self
    }

    /// Channel for [`SessionEvent`]s
    pub fn events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the manager
    pub fn build(self) -> Result<StreamSessionManager, BVisionError> {
        let transport = self
            .transport
            .ok_or_else(|| BVisionError::MissingConfiguration {
                field: "transport".to_string(),
            })?;
        let factory = self
            .factory
            .ok_or_else(|| BVisionError::MissingConfiguration {
                field: "peer_factory".to_string(),
            })?;

        Ok(StreamSessionManager {
            inner: Arc::new(SessionInner {
                transport,
                factory,
                rtc_config: self.rtc_config,
                surface: self.surface,
                events: self.events,
                state: Mutex::new(SessionState::default()),
            }),
        })
    }
}

/// Owns at most one media session for one device tile
pub struct StreamSessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    transport: Arc<dyn SignalingTransport>,
    factory: Arc<dyn PeerConnectionFactory>,
    rtc_config: RtcConfiguration,
    surface: Arc<dyn VideoSurface>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    state: Mutex<SessionState>,
}

struct SessionState {
    phase: SessionPhase,
    /// Bumped by every `start()` and `stop()`; a pending start that sees a
    /// different value has been superseded.
    generation: u64,
    session_id: Option<SessionId>,
    device_key: Option<String>,
    topic: Option<String>,
    peer: Option<Arc<dyn PeerConnection>>,
    connection_state: PeerConnectionState,
    remote_applied: bool,
    pending_candidates: Vec<IceCandidateInit>,
    subscription: Option<SubscriptionGuard>,
    listener: Option<JoinHandle<()>>,
    started_at: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            generation: 0,
            session_id: None,
            device_key: None,
            topic: None,
            peer: None,
            connection_state: PeerConnectionState::New,
            remote_applied: false,
            pending_candidates: Vec::new(),
            subscription: None,
            listener: None,
            started_at: None,
        }
    }
}

/// Resources removed from the state, released outside the lock
struct Teardown {
    peer: Option<Arc<dyn PeerConnection>>,
    subscription: Option<SubscriptionGuard>,
    listener: Option<JoinHandle<()>>,
}

impl Teardown {
    fn release(self) -> bool {
        let had_any = self.peer.is_some() || self.listener.is_some();
        drop(self.subscription);
        if let Some(listener) = self.listener {
            listener.abort();
        }
        if let Some(peer) = self.peer {
            peer.close();
        }
        had_any
    }
}

impl SessionState {
    fn teardown(&mut self) -> Teardown {
        Teardown {
            peer: self.peer.take(),
            subscription: self.subscription.take(),
            listener: self.listener.take(),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

impl StreamSessionManager {
    /// Create a builder
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Start streaming from `device` through the hub `hub_key`.
    ///
    /// Does nothing while a session is starting or live. A session that
    /// ended up disconnected, failed or closed is replaced. On failure the
    /// partial peer connection is closed and the error returned; nothing is
    /// retried.
    pub async fn start(&self, device: &Device, hub_key: &str) -> Result<(), BVisionError> {
        self.inner.start(device, hub_key).await
    }

    /// Apply one inbound signaling envelope
    pub async fn handle_inbound(
        &self,
        envelope: &SignalingEnvelope,
    ) -> Result<InboundOutcome, BVisionError> {
        self.inner.handle_inbound(envelope).await
    }

    /// Send a locally gathered ICE candidate to the device
    pub async fn on_local_candidate(
        &self,
        candidate: IceCandidateInit,
    ) -> Result<(), BVisionError> {
        self.inner.on_local_candidate(candidate).await
    }

    /// Record a platform-reported connection state
    pub fn on_connection_state_change(&self, state: PeerConnectionState) {
        self.inner.on_connection_state_change(state);
    }

    /// Attach a remote track to the tile
    pub fn on_track(&self, track: MediaTrack) {
        self.inner.on_track(track);
    }

    /// Tear the session down. Synchronous, idempotent, safe in every phase.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Last known connection state
    pub fn connection_state(&self) -> PeerConnectionState {
        self.inner.state.lock().connection_state
    }

    /// Live session id
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.state.lock().session_id.clone()
    }

    /// Whether a session is starting or live
    pub fn is_active(&self) -> bool {
        let state = self.inner.state.lock();
        match state.phase {
            SessionPhase::Idle => false,
            SessionPhase::Starting => true,
            SessionPhase::Active => state.connection_state.is_live(),
        }
    }

    /// Current state for diagnostics
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock();
        SessionSnapshot {
            device_key: state.device_key.clone(),
            session_id: state.session_id.clone(),
            phase: state.phase,
            state: state.connection_state,
            started_at: state.started_at,
            pending_remote_candidates: state.pending_candidates.len(),
        }
    }
}

impl Drop for StreamSessionManager {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

impl std::fmt::Debug for StreamSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSessionManager")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl SessionInner {
    /// Release torn-down resources; media is detached when a session
    /// actually ended
    fn release(&self, teardown: Teardown) -> bool {
        let released = teardown.release();
        if released {
            self.surface.detach();
        }
        released
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn report(&self, device_key: &str, err: &BVisionError) {
        self.emit(SessionEvent::Error {
            device_key: device_key.to_string(),
            code: err.error_code(),
            message: err.to_string(),
        });
    }

    async fn start(self: &Arc<Self>, device: &Device, hub_key: &str) -> Result<(), BVisionError> {
        let device_key = device.signaling_key().to_string();
        let topic = topic(hub_key, &device_key);
        let session_id = SessionId::generate();

        let (generation, previous, replaced) = {
            let mut state = self.state.lock();
            match state.phase {
                SessionPhase::Starting => {
                    debug!("Session for {:?} already starting", state.device_key);
                    return Ok(());
                }
                SessionPhase::Active if state.connection_state.is_live() => {
                    debug!("Session for {:?} already active", state.device_key);
                    return Ok(());
                }
                _ => {}
            }
            let replaced = match (&state.device_key, state.connection_state) {
                (Some(key), old) if old != PeerConnectionState::Closed => Some(key.clone()),
                _ => None,
            };
            let previous = state.teardown();
            state.generation += 1;
            state.phase = SessionPhase::Starting;
            state.session_id = Some(session_id.clone());
            state.device_key = Some(device_key.clone());
            state.topic = Some(topic.clone());
            state.connection_state = PeerConnectionState::New;
            state.remote_applied = false;
            state.pending_candidates.clear();
            state.started_at = Some(Utc::now());
            (state.generation, previous, replaced)
        };
        if self.release(previous) {
            debug!("Replaced ended session for {}", device_key);
            if let Some(old_key) = replaced {
                self.emit(SessionEvent::StateChanged {
                    device_key: old_key,
                    state: PeerConnectionState::Closed,
                });
            }
        }

        info!("Starting stream session {} for {}", session_id, device_key);
        match self
            .negotiate(generation, &device_key, &topic, &session_id)
            .await
        {
            Ok(true) => {
                info!("Stream requested from {} on {}", device_key, topic);
                Ok(())
            }
            Ok(false) => {
                debug!("Start of session {} superseded", session_id);
                Ok(())
            }
            Err(e) => {
                let teardown = {
                    let mut state = self.state.lock();
                    if !state.is_current(generation) {
                        None
                    } else {
                        state.phase = SessionPhase::Idle;
                        state.session_id = None;
                        state.connection_state = PeerConnectionState::Closed;
                        Some(state.teardown())
                    }
                };
                let Some(teardown) = teardown else {
                    debug!("Superseded session {} failed late: {}", session_id, e);
                    return Ok(());
                };
                error!("Failed to start session for {}: {}", device_key, e);
                self.release(teardown);
                self.report(&device_key, &e);
                Err(e)
            }
        }
    }

    /// Returns `Ok(false)` when a `stop()` or newer `start()` superseded
    /// this attempt.
    async fn negotiate(
        self: &Arc<Self>,
        generation: u64,
        device_key: &str,
        topic: &str,
        session_id: &SessionId,
    ) -> Result<bool, BVisionError> {
        let negotiation = |stage: &str, e: BVisionError| BVisionError::Negotiation {
            device_key: device_key.to_string(),
            stage: stage.to_string(),
            reason: e.to_string(),
        };

        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let peer = self
            .factory
            .create(&self.rtc_config, peer_tx)
            .map_err(|e| negotiation("create-peer-connection", e))?;
        {
            let mut state = self.state.lock();
            if !state.is_current(generation) {
                drop(state);
                peer.close();
                return Ok(false);
            }
            state.peer = Some(peer.clone());
        }

        let offer = peer
            .create_offer(OfferOptions::receive_all())
            .await
            .map_err(|e| negotiation("create-offer", e))?;
        peer.set_local_description(offer.clone())
            .await
            .map_err(|e| negotiation("set-local-description", e))?;
        if !self.state.lock().is_current(generation) {
            peer.close();
            return Ok(false);
        }

        let subscription = self.transport.subscribe(topic);
        let envelope =
            SignalingEnvelope::request_stream(topic.to_string(), device_key, session_id, &offer)?;
        self.transport.publish(&envelope).await?;

        let mut state = self.state.lock();
        if !state.is_current(generation) {
            drop(state);
            peer.close();
            return Ok(false);
        }
        let (guard, inbound) = subscription.into_parts();
        state.phase = SessionPhase::Active;
        state.subscription = Some(guard);
        state.listener = Some(tokio::spawn(run_listener(
            Arc::downgrade(self),
            generation,
            inbound,
            peer_rx,
        )));
        Ok(true)
    }

    async fn handle_inbound(
        &self,
        envelope: &SignalingEnvelope,
    ) -> Result<InboundOutcome, BVisionError> {
        let payload = envelope.payload();

        let (peer, device_key, remote_applied) = {
            let state = self.state.lock();
            let Some(session_id) = state.session_id.as_ref() else {
                debug!("Dropping {} before any session", payload.action);
                return Ok(InboundOutcome::Ignored(IgnoreReason::NoSession));
            };
            if *session_id != payload.value.session_id {
                debug!(
                    "Dropping {} for stale session {}",
                    payload.action, payload.value.session_id
                );
                return Ok(InboundOutcome::Ignored(IgnoreReason::StaleSession));
            }
            let device_key = state.device_key.clone().unwrap_or_default();
            if payload.device_id != device_key {
                debug!("Dropping {} for device {}", payload.action, payload.device_id);
                return Ok(InboundOutcome::Ignored(IgnoreReason::ForeignDevice));
            }
            let Some(peer) = state.peer.clone() else {
                return Ok(InboundOutcome::Ignored(IgnoreReason::NoSession));
            };
            (peer, device_key, state.remote_applied)
        };

        match payload.action {
            SignalingAction::RequestStream => {
                debug!("Ignoring request-stream echoed back to viewer");
                Ok(InboundOutcome::Ignored(IgnoreReason::UnexpectedAction))
            }
            SignalingAction::ReceiveAnswer => {
                if remote_applied {
                    debug!("Ignoring duplicate answer for {}", device_key);
                    return Ok(InboundOutcome::Ignored(IgnoreReason::DuplicateAnswer));
                }
                self.apply_answer(peer, &device_key, payload.value.sdp.as_deref())
                    .await
                    .inspect_err(|e| self.report(&device_key, e))
            }
            SignalingAction::ReceiveCandidates => {
                self.apply_remote_candidate(peer, &device_key, payload.value.candidate.as_deref())
                    .await
                    .inspect_err(|e| self.report(&device_key, e))
            }
        }
    }

    async fn apply_answer(
        &self,
        peer: Arc<dyn PeerConnection>,
        device_key: &str,
        sdp: Option<&str>,
    ) -> Result<InboundOutcome, BVisionError> {
        let encoded = sdp.ok_or_else(|| BVisionError::InvalidPayload {
            field: "sdp".to_string(),
            reason: "answer carries no description".to_string(),
        })?;
        let answer = decode_description(encoded)?;
        peer.set_remote_description(answer)
            .await
            .map_err(|e| BVisionError::Negotiation {
                device_key: device_key.to_string(),
                stage: "set-remote-description".to_string(),
                reason: e.to_string(),
            })?;

        let (pending, connecting) = {
            let mut state = self.state.lock();
            state.remote_applied = true;
            let connecting = state.connection_state == PeerConnectionState::New;
            if connecting {
                state.connection_state = PeerConnectionState::Connecting;
            }
            (std::mem::take(&mut state.pending_candidates), connecting)
        };
        info!("Answer applied for {}", device_key);
        if connecting {
            self.emit(SessionEvent::StateChanged {
                device_key: device_key.to_string(),
                state: PeerConnectionState::Connecting,
            });
        }

        if !pending.is_empty() {
            debug!("Flushing {} buffered candidates for {}", pending.len(), device_key);
        }
        for candidate in pending {
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!("Buffered candidate rejected for {}: {}", device_key, e);
                self.report(device_key, &e);
            }
        }
        Ok(InboundOutcome::Applied)
    }

    async fn apply_remote_candidate(
        &self,
        peer: Arc<dyn PeerConnection>,
        device_key: &str,
        candidate: Option<&str>,
    ) -> Result<InboundOutcome, BVisionError> {
        let encoded = candidate.ok_or_else(|| BVisionError::InvalidPayload {
            field: "candidate".to_string(),
            reason: "message carries no candidate".to_string(),
        })?;
        let candidate = decode_candidate(encoded)?;

        {
            let mut state = self.state.lock();
            if !state.remote_applied {
                state.pending_candidates.push(candidate);
                return Ok(InboundOutcome::Buffered);
            }
        }

        peer.add_ice_candidate(candidate)
            .await
            .map_err(|e| BVisionError::Negotiation {
                device_key: device_key.to_string(),
                stage: "add-ice-candidate".to_string(),
                reason: e.to_string(),
            })?;
        Ok(InboundOutcome::Applied)
    }

    async fn on_local_candidate(&self, candidate: IceCandidateInit) -> Result<(), BVisionError> {
        let (topic, device_key, session_id) = {
            let state = self.state.lock();
            match (&state.topic, &state.device_key, &state.session_id) {
                (Some(topic), Some(device_key), Some(session_id)) => {
                    (topic.clone(), device_key.clone(), session_id.clone())
                }
                _ => {
                    debug!("Dropping local candidate without a session");
                    return Ok(());
                }
            }
        };

        let envelope = SignalingEnvelope::candidate(topic, &device_key, &session_id, &candidate)?;
        if let Err(e) = self.transport.publish(&envelope).await {
            warn!("Failed to send local candidate for {}: {}", device_key, e);
            self.report(&device_key, &e);
            return Err(e);
        }
        Ok(())
    }

    fn on_connection_state_change(&self, new_state: PeerConnectionState) {
        let device_key = {
            let mut state = self.state.lock();
            if state.phase == SessionPhase::Idle || state.connection_state == new_state {
                return;
            }
            state.connection_state = new_state;
            state.device_key.clone().unwrap_or_default()
        };
        info!("Session for {} is {}", device_key, new_state);
        self.emit(SessionEvent::StateChanged {
            device_key,
            state: new_state,
        });
    }

    fn on_track(&self, track: MediaTrack) {
        let device_key = {
            let state = self.state.lock();
            if state.phase == SessionPhase::Idle {
                debug!("Dropping track {} without a session", track.id);
                return;
            }
            state.device_key.clone().unwrap_or_default()
        };
        self.surface.attach(&track);
        debug!("Attached {:?} track {} for {}", track.kind, track.id, device_key);
        self.emit(SessionEvent::MediaAttached { device_key, track });
    }

    fn stop(&self) {
        let (teardown, device_key, changed) = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.phase = SessionPhase::Idle;
            state.session_id = None;
            state.remote_applied = false;
            state.pending_candidates.clear();
            let changed = state.connection_state != PeerConnectionState::Closed
                && state.device_key.is_some();
            state.connection_state = PeerConnectionState::Closed;
            (state.teardown(), state.device_key.clone(), changed)
        };

        self.release(teardown);
        if let (true, Some(device_key)) = (changed, device_key) {
            info!("Stopped stream session for {}", device_key);
            self.emit(SessionEvent::StateChanged {
                device_key,
                state: PeerConnectionState::Closed,
            });
        }
    }
}

async fn run_listener(
    inner: Weak<SessionInner>,
    generation: u64,
    mut inbound: mpsc::UnboundedReceiver<SignalingEnvelope>,
    mut peer_events: mpsc::UnboundedReceiver<PeerEvent>,
) {
    loop {
        tokio::select! {
            envelope = inbound.recv() => {
                let Some(envelope) = envelope else { break };
                let Some(inner) = current(&inner, generation) else { break };
                if let Err(e) = inner.handle_inbound(&envelope).await {
                    warn!("Failed to process {}: {}", envelope.payload().action, e);
                }
            }
            event = peer_events.recv() => {
                let Some(event) = event else { break };
                let Some(inner) = current(&inner, generation) else { break };
                match event {
                    PeerEvent::IceCandidate(candidate) => {
                        let _ = inner.on_local_candidate(candidate).await;
                    }
                    PeerEvent::ConnectionStateChanged(state) => {
                        inner.on_connection_state_change(state);
                    }
                    PeerEvent::Track(track) => inner.on_track(track),
                }
            }
        }
    }
    debug!("Session listener {} finished", generation);
}

fn current(inner: &Weak<SessionInner>, generation: u64) -> Option<Arc<SessionInner>> {
    let inner = inner.upgrade()?;
    let live = inner.state.lock().is_current(generation);
    live.then_some(inner)
}
