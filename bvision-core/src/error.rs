//! Error types for the BVision Hub client

use crate::forms::ValidationErrors;
use thiserror::Error;

/// Main error type for BVision client operations
#[derive(Error, Debug)]
pub enum BVisionError {
    /// Initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// A configuration value could not be used
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration {
        /// Configuration field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// REST request could not be completed
    #[error("HTTP request to {url} failed: {reason}")]
    Http {
        /// Request URL
        url: String,
        /// Reason for failure
        reason: String,
    },

    /// Backend answered with a non-success status
    #[error("API error {status} from {url}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Request URL
        url: String,
        /// Response body or status text
        message: String,
    },

    /// Signaling relay refused or failed to deliver a message
    #[error("Signaling relay error: {reason}")]
    Relay {
        /// Reason reported by the relay
        reason: String,
    },

    /// Signaling transport error
    #[error("Transport error: {reason}")]
    Transport {
        /// Reason for transport error
        reason: String,
    },

    /// Offer, description or candidate handling failed
    #[error("Negotiation failed for device {device_key} during {stage}: {reason}")]
    Negotiation {
        /// Device whose session failed
        device_key: String,
        /// Negotiation step that failed
        stage: String,
        /// Reason for failure
        reason: String,
    },

    /// A signaling payload could not be decoded
    #[error("Invalid {field} payload: {reason}")]
    InvalidPayload {
        /// Payload field that failed to decode
        field: String,
        /// Decoding error
        reason: String,
    },

    /// Invalid message format
    #[error("Invalid message format: {message}, error: {source}")]
    InvalidMessage {
        /// Invalid message content
        message: String,
        /// Parsing error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid data error
    #[error("Invalid data: {reason}")]
    InvalidData {
        /// Reason for invalid data
        reason: String,
    },

    /// Form input rejected by local validation
    #[error("Validation failed: {errors}")]
    Validation {
        /// Field-level messages
        errors: ValidationErrors,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Device is not reachable for streaming
    #[error("Device {device_key} is offline")]
    DeviceOffline {
        /// Device key
        device_key: String,
    },

    /// Operation requires a signed-in user
    #[error("Not authenticated")]
    Unauthenticated,
}

impl BVisionError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            BVisionError::Initialization { .. } => "INITIALIZATION_FAILED".to_string(),
            BVisionError::MissingConfiguration { .. } => "MISSING_CONFIGURATION".to_string(),
            BVisionError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION".to_string(),
            BVisionError::Http { .. } => "HTTP_ERROR".to_string(),
            BVisionError::Api { .. } => "API_ERROR".to_string(),
            BVisionError::Relay { .. } => "RELAY_ERROR".to_string(),
            BVisionError::Transport { .. } => "TRANSPORT_ERROR".to_string(),
            BVisionError::Negotiation { .. } => "NEGOTIATION_FAILED".to_string(),
            BVisionError::InvalidPayload { .. } => "INVALID_PAYLOAD".to_string(),
            BVisionError::InvalidMessage { .. } => "INVALID_MESSAGE".to_string(),
            BVisionError::InvalidData { .. } => "INVALID_DATA".to_string(),
            BVisionError::Validation { .. } => "VALIDATION_FAILED".to_string(),
            BVisionError::InvalidState { .. } => "INVALID_STATE".to_string(),
            BVisionError::DeviceOffline { .. } => "DEVICE_OFFLINE".to_string(),
            BVisionError::Unauthenticated => "UNAUTHENTICATED".to_string(),
        }
    }

    /// REST or signaling delivery failures
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BVisionError::Http { .. }
                | BVisionError::Api { .. }
                | BVisionError::Relay { .. }
                | BVisionError::Transport { .. }
        )
    }

    /// Failures while building or applying session descriptions and candidates
    pub fn is_negotiation(&self) -> bool {
        matches!(
            self,
            BVisionError::Negotiation { .. } | BVisionError::InvalidPayload { .. }
        )
    }

    /// Field errors when this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            BVisionError::Validation { errors } => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for BVisionError {
    fn from(errors: ValidationErrors) -> Self {
        BVisionError::Validation { errors }
    }
}
