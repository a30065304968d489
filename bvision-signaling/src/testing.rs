//! In-process fakes of the host peer-connection capabilities

use crate::peer::{
    IceCandidateInit, MediaTrack, OfferOptions, PeerConnection, PeerConnectionFactory,
    PeerConnectionState, PeerEvent, PeerEventSender, RtcConfiguration, SessionDescription,
    VideoSurface,
};
use async_trait::async_trait;
use bvision_core::BVisionError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
struct FailurePlan {
    create: bool,
    create_offer: bool,
    set_local_description: bool,
    set_remote_description: bool,
    add_ice_candidate: bool,
}

/// Factory handing out [`FakePeer`]s and keeping them for inspection
#[derive(Debug, Default)]
pub struct FakePeerFactory {
    plan: FailurePlan,
    offer_delay: Option<Duration>,
    peers: Mutex<Vec<Arc<FakePeer>>>,
    configs: Mutex<Vec<RtcConfiguration>>,
}

impl FakePeerFactory {
    /// Factory whose peers succeed at everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create peers
    pub fn fail_create(mut self) -> Self {
        self.plan.create = true;
        self
    }

    /// Peers fail `create_offer`
    pub fn fail_create_offer(mut self) -> Self {
        self.plan.create_offer = true;
        self
    }

    /// Peers fail `set_local_description`
    pub fn fail_set_local_description(mut self) -> Self {
        self.plan.set_local_description = true;
        self
    }

    /// Peers fail `set_remote_description`
    pub fn fail_set_remote_description(mut self) -> Self {
        self.plan.set_remote_description = true;
        self
    }

    /// Peers fail `add_ice_candidate`
    pub fn fail_add_ice_candidate(mut self) -> Self {
        self.plan.add_ice_candidate = true;
        self
    }

    /// Peers take this long to create an offer
    pub fn offer_delay(mut self, delay: Duration) -> Self {
        self.offer_delay = Some(delay);
        self
    }

    /// Number of peers created so far
    pub fn created(&self) -> usize {
        self.peers.lock().len()
    }

    /// All peers, oldest first
    pub fn peers(&self) -> Vec<Arc<FakePeer>> {
        self.peers.lock().clone()
    }

    /// Most recently created peer
    pub fn last_peer(&self) -> Option<Arc<FakePeer>> {
        self.peers.lock().last().cloned()
    }

    /// Configurations peers were created with
    pub fn configs(&self) -> Vec<RtcConfiguration> {
        self.configs.lock().clone()
    }
}

impl PeerConnectionFactory for FakePeerFactory {
    fn create(
        &self,
        config: &RtcConfiguration,
        events: PeerEventSender,
    ) -> Result<Arc<dyn PeerConnection>, BVisionError> {
        self.configs.lock().push(config.clone());
        if self.plan.create {
            return Err(BVisionError::Initialization {
                reason: "peer connection unavailable".to_string(),
            });
        }
        let index = self.peers.lock().len();
        let peer = Arc::new(FakePeer {
            index,
            plan: self.plan,
            offer_delay: self.offer_delay,
            events,
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            state: Mutex::new(PeerConnectionState::New),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            candidates: Mutex::new(Vec::new()),
        });
        self.peers.lock().push(peer.clone());
        Ok(peer)
    }
}

/// Peer connection that records what the session does to it
#[derive(Debug)]
pub struct FakePeer {
    index: usize,
    plan: FailurePlan,
    offer_delay: Option<Duration>,
    events: PeerEventSender,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    state: Mutex<PeerConnectionState>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    candidates: Mutex<Vec<IceCandidateInit>>,
}

fn refused(step: &str) -> BVisionError {
    BVisionError::Transport {
        reason: format!("fake peer refused {step}"),
    }
}

impl FakePeer {
    /// Raise a native callback as the platform would
    pub fn emit(&self, event: PeerEvent) {
        if let PeerEvent::ConnectionStateChanged(state) = &event {
            *self.state.lock() = *state;
        }
        let _ = self.events.send(event);
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// How many times `close` was called
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Applied local description
    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().clone()
    }

    /// Applied remote description
    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }

    /// Remote candidates added, in order
    pub fn candidates(&self) -> Vec<IceCandidateInit> {
        self.candidates.lock().clone()
    }
}

#[async_trait]
impl PeerConnection for FakePeer {
    async fn create_offer(
        &self,
        options: OfferOptions,
    ) -> Result<SessionDescription, BVisionError> {
        if let Some(delay) = self.offer_delay {
            tokio::time::sleep(delay).await;
        }
        if self.plan.create_offer {
            return Err(refused("create_offer"));
        }
        let mut sdp = format!("v=0\r\no=- {} 2 IN IP4 127.0.0.1\r\ns=-\r\n", 1000 + self.index);
        if options.offer_to_receive_audio {
            sdp.push_str("m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=recvonly\r\n");
        }
        if options.offer_to_receive_video {
            sdp.push_str("m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=recvonly\r\n");
        }
        Ok(SessionDescription::offer(sdp))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), BVisionError> {
        if self.plan.set_local_description {
            return Err(refused("set_local_description"));
        }
        *self.local.lock() = Some(description);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), BVisionError> {
        if self.plan.set_remote_description {
            return Err(refused("set_remote_description"));
        }
        *self.remote.lock() = Some(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), BVisionError> {
        if self.plan.add_ice_candidate {
            return Err(refused("add_ice_candidate"));
        }
        self.candidates.lock().push(candidate);
        Ok(())
    }

    fn connection_state(&self) -> PeerConnectionState {
        *self.state.lock()
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        *self.state.lock() = PeerConnectionState::Closed;
    }
}

/// Surface that records attach and detach calls
#[derive(Debug, Default)]
pub struct RecordingSurface {
    attached: Mutex<Vec<String>>,
    detached: AtomicUsize,
}

impl RecordingSurface {
    /// Ids of attached tracks, in order
    pub fn attached(&self) -> Vec<String> {
        self.attached.lock().clone()
    }

    /// Number of detach calls
    pub fn detached(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }
}

impl VideoSurface for RecordingSurface {
    fn attach(&self, track: &MediaTrack) {
        self.attached.lock().push(track.id.clone());
    }

    fn detach(&self) {
        self.detached.fetch_add(1, Ordering::SeqCst);
    }
}
