//! Signaling relay wire protocol
//!
//! Every message crossing the relay is an envelope addressed to a topic
//! `hub_key/device_key`:
//!
//! ```json
//! { "topic": "hub/cam-1",
//!   "message": { "payload": {
//!       "action": "request-stream",
//!       "deviceId": "cam-1",
//!       "value": { "sdp": "<base64 JSON>", "session_id": "..." } } } }
//! ```
//!
//! Session descriptions travel as base64 of their JSON form, ICE candidates
//! as a JSON string.

use crate::peer::{IceCandidateInit, SessionDescription};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bvision_core::BVisionError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed vocabulary of signaling actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalingAction {
    /// Viewer asks the device for a stream, carrying the offer
    RequestStream,
    /// Device replies with its answer
    ReceiveAnswer,
    /// Either side trickles an ICE candidate
    ReceiveCandidates,
}

impl SignalingAction {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalingAction::RequestStream => "request-stream",
            SignalingAction::ReceiveAnswer => "receive-answer",
            SignalingAction::ReceiveCandidates => "receive-candidates",
        }
    }
}

impl fmt::Display for SignalingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation id of one stream session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh id: current time in milliseconds mixed with 32 random bits
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let salt: u32 = rand::thread_rng().gen();
        Self(format!("{:x}{:08x}", millis, salt))
    }

    /// Borrow as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Action-specific value carried by a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingValue {
    /// Base64 of the JSON session description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,
    /// JSON-encoded ICE candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    /// Session this message belongs to
    pub session_id: SessionId,
}

/// Addressed signaling payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingPayload {
    /// What the receiver should do
    pub action: SignalingAction,
    /// Device key the message concerns
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// Action data
    pub value: SignalingValue,
}

/// Body wrapper around the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingBody {
    /// The payload
    pub payload: SignalingPayload,
}

/// Topic-addressed message as published to and received from the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingEnvelope {
    /// `hub_key/device_key`
    pub topic: String,
    /// Message body
    pub message: SignalingBody,
}

/// Relay topic for a device behind a hub
pub fn topic(hub_key: &str, device_key: &str) -> String {
    format!("{}/{}", hub_key, device_key)
}

impl SignalingEnvelope {
    fn new(topic: String, action: SignalingAction, device_id: &str, value: SignalingValue) -> Self {
        Self {
            topic,
            message: SignalingBody {
                payload: SignalingPayload {
                    action,
                    device_id: device_id.to_string(),
                    value,
                },
            },
        }
    }

    /// `request-stream` carrying the local offer
    pub fn request_stream(
        topic: String,
        device_id: &str,
        session_id: &SessionId,
        offer: &SessionDescription,
    ) -> Result<Self, BVisionError> {
        Ok(Self::new(
            topic,
            SignalingAction::RequestStream,
            device_id,
            SignalingValue {
                sdp: Some(encode_description(offer)?),
                candidate: None,
                session_id: session_id.clone(),
            },
        ))
    }

    /// `receive-answer` carrying a remote answer
    pub fn answer(
        topic: String,
        device_id: &str,
        session_id: &SessionId,
        answer: &SessionDescription,
    ) -> Result<Self, BVisionError> {
        Ok(Self::new(
            topic,
            SignalingAction::ReceiveAnswer,
            device_id,
            SignalingValue {
                sdp: Some(encode_description(answer)?),
                candidate: None,
                session_id: session_id.clone(),
            },
        ))
    }

    /// `receive-candidates` carrying one ICE candidate
    pub fn candidate(
        topic: String,
        device_id: &str,
        session_id: &SessionId,
        candidate: &IceCandidateInit,
    ) -> Result<Self, BVisionError> {
        Ok(Self::new(
            topic,
            SignalingAction::ReceiveCandidates,
            device_id,
            SignalingValue {
                sdp: None,
                candidate: Some(encode_candidate(candidate)?),
                session_id: session_id.clone(),
            },
        ))
    }

    /// Shortcut to the payload
    pub fn payload(&self) -> &SignalingPayload {
        &self.message.payload
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, BVisionError> {
        serde_json::to_string(self).map_err(|e| BVisionError::InvalidMessage {
            message: format!("envelope for {}", self.topic),
            source: e.into(),
        })
    }

    /// Parse a JSON text frame
    pub fn from_json(text: &str) -> Result<Self, BVisionError> {
        serde_json::from_str(text).map_err(|e| BVisionError::InvalidMessage {
            message: "signaling envelope".to_string(),
            source: e.into(),
        })
    }
}

/// Base64 of the description's JSON form
pub fn encode_description(description: &SessionDescription) -> Result<String, BVisionError> {
    let json = serde_json::to_vec(description).map_err(|e| BVisionError::InvalidPayload {
        field: "sdp".to_string(),
        reason: e.to_string(),
    })?;
    Ok(STANDARD.encode(json))
}

/// Inverse of [`encode_description`]
pub fn decode_description(encoded: &str) -> Result<SessionDescription, BVisionError> {
    let json = STANDARD
        .decode(encoded.trim())
        .map_err(|e| BVisionError::InvalidPayload {
            field: "sdp".to_string(),
            reason: format!("not base64: {}", e),
        })?;
    serde_json::from_slice(&json).map_err(|e| BVisionError::InvalidPayload {
        field: "sdp".to_string(),
        reason: format!("not a session description: {}", e),
    })
}

/// JSON string form of a candidate
pub fn encode_candidate(candidate: &IceCandidateInit) -> Result<String, BVisionError> {
    serde_json::to_string(candidate).map_err(|e| BVisionError::InvalidPayload {
        field: "candidate".to_string(),
        reason: e.to_string(),
    })
}

/// Inverse of [`encode_candidate`]
pub fn decode_candidate(encoded: &str) -> Result<IceCandidateInit, BVisionError> {
    serde_json::from_str(encoded).map_err(|e| BVisionError::InvalidPayload {
        field: "candidate".to_string(),
        reason: format!("not an ICE candidate: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::SdpType;

    fn offer() -> SessionDescription {
        SessionDescription {
            sdp_type: SdpType::Offer,
            sdp: "v=0\r\no=- 46117317 2 IN IP4 127.0.0.1\r\ns=-\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\n"
                .to_string(),
        }
    }

    #[test]
    fn test_description_round_trip() {
        let encoded = encode_description(&offer()).unwrap();
        assert!(!encoded.contains('\n'));
        assert_eq!(decode_description(&encoded).unwrap(), offer());
    }

    #[test]
    fn test_request_stream_wire_shape() {
        let session_id = SessionId::from("abc");
        let envelope =
            SignalingEnvelope::request_stream(topic("hub", "cam-1"), "cam-1", &session_id, &offer())
                .unwrap();
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(value["topic"], "hub/cam-1");
        let payload = &value["message"]["payload"];
        assert_eq!(payload["action"], "request-stream");
        assert_eq!(payload["deviceId"], "cam-1");
        assert_eq!(payload["value"]["session_id"], "abc");
        assert!(payload["value"].get("candidate").is_none());

        let sdp = payload["value"]["sdp"].as_str().unwrap();
        let decoded: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(sdp).unwrap()).unwrap();
        assert_eq!(decoded["type"], "offer");
    }

    #[test]
    fn test_candidate_is_json_string() {
        let candidate = IceCandidateInit {
            candidate: "candidate:1 1 udp 2122260223 192.168.1.20 54321 typ host".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
            username_fragment: None,
        };
        let envelope = SignalingEnvelope::candidate(
            topic("hub", "cam-1"),
            "cam-1",
            &SessionId::from("abc"),
            &candidate,
        )
        .unwrap();
        let raw = envelope.payload().value.candidate.clone().unwrap();
        assert!(raw.contains("\"sdpMid\":\"0\""));
        assert_eq!(decode_candidate(&raw).unwrap(), candidate);
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_description("!!!").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PAYLOAD");
        let not_json = STANDARD.encode("hello");
        assert!(decode_description(&not_json).unwrap_err().is_negotiation());
        assert!(decode_candidate("{").is_err());
    }

    #[test]
    fn test_unknown_action_rejected() {
        let text = r#"{"topic":"hub/cam-1","message":{"payload":{"action":"reboot","deviceId":"cam-1","value":{"session_id":"x"}}}}"#;
        assert!(SignalingEnvelope::from_json(text).is_err());
    }

    #[test]
    fn test_session_ids_differ() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().len() > 8);
    }
}
