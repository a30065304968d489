use crate::client::ApiClient;
use bvision_core::BVisionError;
use serde::{Deserialize, Serialize};

/// Signaling relay publish path
pub const WEBRTC_MESSAGE_PATH: &str = "/webrtc/message";

/// Relay acknowledgement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebRtcMessageRes {
    /// Whether the relay accepted the message
    pub success: bool,
    /// Relay-assigned message identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Reason for rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Publishes signaling envelopes through the REST relay endpoint
#[derive(Debug, Clone)]
pub struct WebRtcService {
    client: ApiClient,
}

impl WebRtcService {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Post one envelope. A `success: false` reply is returned as-is.
    pub async fn send_message<M: Serialize + Sync>(
        &self,
        message: &M,
    ) -> Result<WebRtcMessageRes, BVisionError> {
        self.client.post(WEBRTC_MESSAGE_PATH, message).await
    }
}
