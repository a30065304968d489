//! Structured logging setup

use bvision_core::BVisionError;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Install the global fmt subscriber, honouring `RUST_LOG`
pub fn init_logging() -> Result<(), BVisionError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

/// Install the global fmt subscriber with an explicit filter such as
/// `"bvision_signaling=debug,info"`
pub fn init_logging_with(directives: &str) -> Result<(), BVisionError> {
    let filter = EnvFilter::try_new(directives).map_err(|e| BVisionError::InvalidConfiguration {
        field: "log_filter".to_string(),
        reason: e.to_string(),
    })?;
    install(filter)
}

fn install(filter: EnvFilter) -> Result<(), BVisionError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| BVisionError::Initialization {
            reason: format!("Failed to install log subscriber: {}", e),
        })
}

/// Logging entry point kept for callers that prefer a type
#[derive(Debug, Default)]
pub struct DebugLogger;

impl DebugLogger {
    /// Create new debug logger
    pub fn new() -> Self {
        Self
    }

    /// Initialize logging system
    pub fn init_logging() -> Result<(), BVisionError> {
        init_logging()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_directive_rejected() {
        let err = init_logging_with("bvision=verbose").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn test_second_install_fails_cleanly() {
        let _ = init_logging_with("warn");
        assert!(DebugLogger::init_logging().is_err());
    }
}
