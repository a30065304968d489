//! # BVision Signaling
//!
//! Live-view stream negotiation for BVision Hub.
//! Handles the relay wire protocol, signaling transports and the
//! per-tile Stream Session Manager.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod peer;
pub mod protocol;
pub mod relay;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main types
pub use peer::{
    BundlePolicy, IceCandidateInit, IceServer, IceUrls, MediaKind, MediaTrack, NullSurface,
    OfferOptions, PeerConnection, PeerConnectionFactory, PeerConnectionState, PeerEvent,
    PeerEventSender, RtcConfiguration, RtcpMuxPolicy, SdpType, SessionDescription, VideoSurface,
};
pub use protocol::{SessionId, SignalingAction, SignalingEnvelope, SignalingPayload};
pub use relay::{HttpRelay, MemoryRelay};
pub use session::{
    IgnoreReason, InboundOutcome, SessionBuilder, SessionEvent, SessionPhase, SessionSnapshot,
    StreamSessionManager,
};
pub use transport::{PublishReceipt, RelayRouter, SignalingTransport, Subscription};
