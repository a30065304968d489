//! Peer-connection capabilities supplied by the host platform
//!
//! The session manager never talks to a media stack directly. A host (a
//! browser binding, a native WebRTC library, a test fake) implements
//! [`PeerConnectionFactory`], [`PeerConnection`] and [`VideoSurface`], and
//! reports native callbacks through a [`PeerEventSender`].

use async_trait::async_trait;
use bvision_core::BVisionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Kind of session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Offer
    Offer,
    /// Provisional answer
    Pranswer,
    /// Final answer
    Answer,
    /// Rollback
    Rollback,
}

/// Session description in its standard JSON form `{ "type", "sdp" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description kind
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    /// SDP text
    pub sdp: String,
}

impl SessionDescription {
    /// Build an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    /// Build an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }
}

/// ICE candidate in its standard JSON form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    /// Candidate line
    pub candidate: String,
    /// Media stream identification tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    /// Index of the m-line
    #[serde(default, rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    /// ICE ufrag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Connection state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerConnectionState {
    /// Created, nothing negotiated
    New,
    /// Answer applied, ICE/DTLS in progress
    Connecting,
    /// Media can flow
    Connected,
    /// Connectivity lost, may recover
    Disconnected,
    /// Connectivity lost for good
    Failed,
    /// Closed locally
    Closed,
}

impl PeerConnectionState {
    /// Whether a session in this state counts as live
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            PeerConnectionState::New
                | PeerConnectionState::Connecting
                | PeerConnectionState::Connected
        )
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerConnectionState::New => "new",
            PeerConnectionState::Connecting => "connecting",
            PeerConnectionState::Connected => "connected",
            PeerConnectionState::Disconnected => "disconnected",
            PeerConnectionState::Failed => "failed",
            PeerConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for PeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for offer creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferOptions {
    /// Ask the remote side to send audio
    pub offer_to_receive_audio: bool,
    /// Ask the remote side to send video
    pub offer_to_receive_video: bool,
}

impl OfferOptions {
    /// Receive both audio and video, send nothing
    pub fn receive_all() -> Self {
        Self {
            offer_to_receive_audio: true,
            offer_to_receive_video: true,
        }
    }
}

/// One URL or a list of URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IceUrls {
    /// Single URL
    One(String),
    /// Several URLs sharing credentials
    Many(Vec<String>),
}

impl IceUrls {
    /// All URLs as a flat list
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            IceUrls::One(url) => vec![url.clone()],
            IceUrls::Many(urls) => urls.clone(),
        }
    }
}

/// STUN/TURN server entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    /// Server URL(s)
    pub urls: IceUrls,
    /// TURN username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// TURN credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    /// Server without credentials
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: IceUrls::One(url.into()),
            username: None,
            credential: None,
        }
    }
}

/// Media bundling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundlePolicy {
    /// Bundle per media type
    Balanced,
    /// Separate transports per track
    MaxCompat,
    /// Single transport for everything
    MaxBundle,
}

impl FromStr for BundlePolicy {
    type Err = BVisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "balanced" => Ok(BundlePolicy::Balanced),
            "max-compat" => Ok(BundlePolicy::MaxCompat),
            "max-bundle" => Ok(BundlePolicy::MaxBundle),
            other => Err(BVisionError::InvalidConfiguration {
                field: "bundle_policy".to_string(),
                reason: format!("unknown policy {other:?}"),
            }),
        }
    }
}

/// RTCP multiplexing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RtcpMuxPolicy {
    /// Negotiate multiplexing
    Negotiate,
    /// Require multiplexing
    Require,
}

impl FromStr for RtcpMuxPolicy {
    type Err = BVisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "negotiate" => Ok(RtcpMuxPolicy::Negotiate),
            "require" => Ok(RtcpMuxPolicy::Require),
            other => Err(BVisionError::InvalidConfiguration {
                field: "rtcp_mux_policy".to_string(),
                reason: format!("unknown policy {other:?}"),
            }),
        }
    }
}

/// Peer connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcConfiguration {
    /// STUN/TURN servers
    pub ice_servers: Vec<IceServer>,
    /// Candidates gathered ahead of time
    pub ice_candidate_pool_size: u8,
    /// Bundle policy
    pub bundle_policy: BundlePolicy,
    /// RTCP mux policy
    pub rtcp_mux_policy: RtcpMuxPolicy,
}

impl Default for RtcConfiguration {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServer::stun("stun:stun.l.google.com:19302"),
                IceServer::stun("stun:stun1.l.google.com:19302"),
            ],
            ice_candidate_pool_size: 10,
            bundle_policy: BundlePolicy::MaxBundle,
            rtcp_mux_policy: RtcpMuxPolicy::Require,
        }
    }
}

/// Media kind of a remote track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

/// Handle to a remote media track owned by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    /// Platform track id
    pub id: String,
    /// Audio or video
    pub kind: MediaKind,
    /// Stream the track belongs to
    pub stream_id: Option<String>,
}

/// Native callbacks, delivered as events
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A local ICE candidate was gathered
    IceCandidate(IceCandidateInit),
    /// The connection state changed
    ConnectionStateChanged(PeerConnectionState),
    /// A remote track arrived
    Track(MediaTrack),
}

/// Channel a peer connection reports its callbacks on
pub type PeerEventSender = mpsc::UnboundedSender<PeerEvent>;

/// One platform peer connection
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Create a local offer
    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, BVisionError>;

    /// Apply the local description
    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), BVisionError>;

    /// Apply the remote description
    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), BVisionError>;

    /// Add a remote ICE candidate
    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), BVisionError>;

    /// Current platform state
    fn connection_state(&self) -> PeerConnectionState;

    /// Close the connection. Must tolerate repeated calls.
    fn close(&self);
}

/// Creates peer connections for sessions
pub trait PeerConnectionFactory: Send + Sync {
    /// Create a connection reporting its callbacks on `events`
    fn create(
        &self,
        config: &RtcConfiguration,
        events: PeerEventSender,
    ) -> Result<Arc<dyn PeerConnection>, BVisionError>;
}

/// Where a tile renders its remote media
pub trait VideoSurface: Send + Sync {
    /// Show a remote track
    fn attach(&self, track: &MediaTrack);

    /// Remove whatever is shown
    fn detach(&self);
}

/// Surface that renders nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl VideoSurface for NullSurface {
    fn attach(&self, _track: &MediaTrack) {}

    fn detach(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = RtcConfiguration::default();
        assert_eq!(config.ice_servers.len(), 2);
        assert_eq!(config.ice_candidate_pool_size, 10);
        assert_eq!(config.bundle_policy, BundlePolicy::MaxBundle);
        assert_eq!(config.rtcp_mux_policy, RtcpMuxPolicy::Require);
    }

    #[test]
    fn test_ice_server_urls_forms() {
        let servers: Vec<IceServer> = serde_json::from_str(
            r#"[{"urls":"stun:a:3478"},{"urls":["turn:b:3478","turns:b:5349"],"username":"u","credential":"p"}]"#,
        )
        .unwrap();
        assert_eq!(servers[0].urls.to_vec(), vec!["stun:a:3478"]);
        assert_eq!(servers[1].urls.to_vec().len(), 2);
        assert_eq!(servers[1].username.as_deref(), Some("u"));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("max-compat".parse::<BundlePolicy>().unwrap(), BundlePolicy::MaxCompat);
        assert_eq!("negotiate".parse::<RtcpMuxPolicy>().unwrap(), RtcpMuxPolicy::Negotiate);
        assert!("everything".parse::<BundlePolicy>().is_err());
    }

    #[test]
    fn test_live_states() {
        assert!(PeerConnectionState::Connecting.is_live());
        assert!(!PeerConnectionState::Disconnected.is_live());
        assert!(!PeerConnectionState::Closed.is_live());
    }

    #[test]
    fn test_candidate_json_names() {
        let json = serde_json::to_value(IceCandidateInit {
            candidate: "candidate:1".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(1),
            username_fragment: None,
        })
        .unwrap();
        assert_eq!(json["sdpMLineIndex"], 1);
        assert_eq!(json["sdpMid"], "0");
    }
}
