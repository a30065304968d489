//! Configuration types and defaults
//!
//! Every setting can come from a `BVISION_*` environment variable. Unset or
//! empty variables use the default; unparsable values log a warning and use
//! the default too.

use bvision_api::ApiClient;
use bvision_core::BVisionError;
use bvision_signaling::{BundlePolicy, IceServer, RtcConfiguration, RtcpMuxPolicy};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Application name shown in titles
pub const APP_NAME: &str = "BVision Hub";

/// Peer connection settings for live view
pub type WebRtcConfig = RtcConfiguration;

/// Who resolves navigation routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouterMode {
    /// Routes are fixed in the client
    #[default]
    Frontend,
    /// Routes come from the backend per user
    Backend,
}

impl FromStr for RouterMode {
    type Err = BVisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frontend" => Ok(RouterMode::Frontend),
            "backend" => Ok(RouterMode::Backend),
            other => Err(BVisionError::InvalidConfiguration {
                field: "router_mode".to_string(),
                reason: format!("expected frontend or backend, got {other:?}"),
            }),
        }
    }
}

impl fmt::Display for RouterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RouterMode::Frontend => "frontend",
            RouterMode::Backend => "backend",
        })
    }
}

/// Global BVision configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    /// Application name
    pub app_name: String,
    /// Application version
    pub app_version: String,
    /// Route opened after sign-in
    pub default_route: String,
    /// Public path the client is served under
    pub public_path: String,
    /// REST base URL, absolute or relative to `api_origin`
    pub api_base_url: String,
    /// Origin a relative `api_base_url` is resolved against
    pub api_origin: String,
    /// Routing mode
    pub router_mode: RouterMode,
    /// Hub that relays signaling to the devices
    pub hub_key: String,
    /// WebSocket URL of the inbound signaling relay
    pub signaling_url: Option<String>,
    /// Peer connection settings
    pub webrtc: WebRtcConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            default_route: "/dashboard".to_string(),
            public_path: "/".to_string(),
            api_base_url: "/api".to_string(),
            api_origin: "http://localhost".to_string(),
            router_mode: RouterMode::Frontend,
            hub_key: "hub".to_string(),
            signaling_url: None,
            webrtc: WebRtcConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(route) = get("BVISION_DEFAULT_ROUTE") {
            config.default_route = route;
        }
        if let Some(path) = get("BVISION_PUBLIC_PATH") {
            config.public_path = path;
        }
        if let Some(url) = get("BVISION_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(origin) = get("BVISION_API_ORIGIN") {
            config.api_origin = origin;
        }
        config.router_mode = parsed(
            get("BVISION_ROUTER_MODE"),
            "BVISION_ROUTER_MODE",
            config.router_mode,
        );
        if let Some(hub) = get("BVISION_HUB_KEY") {
            config.hub_key = hub;
        }
        config.signaling_url = get("BVISION_SIGNALING_URL");

        if let Some(raw) = get("BVISION_WEBRTC_ICE_SERVERS") {
            match serde_json::from_str::<Vec<IceServer>>(&raw) {
                Ok(servers) if !servers.is_empty() => config.webrtc.ice_servers = servers,
                Ok(_) => warn!("BVISION_WEBRTC_ICE_SERVERS is empty, using defaults"),
                Err(e) => warn!("Invalid BVISION_WEBRTC_ICE_SERVERS ({}), using defaults", e),
            }
        }
        config.webrtc.ice_candidate_pool_size = parsed(
            get("BVISION_WEBRTC_ICE_CANDIDATE_POOL_SIZE"),
            "BVISION_WEBRTC_ICE_CANDIDATE_POOL_SIZE",
            config.webrtc.ice_candidate_pool_size,
        );
        config.webrtc.bundle_policy = parsed::<BundlePolicy>(
            get("BVISION_WEBRTC_BUNDLE_POLICY"),
            "BVISION_WEBRTC_BUNDLE_POLICY",
            config.webrtc.bundle_policy,
        );
        config.webrtc.rtcp_mux_policy = parsed::<RtcpMuxPolicy>(
            get("BVISION_WEBRTC_RTCP_MUX_POLICY"),
            "BVISION_WEBRTC_RTCP_MUX_POLICY",
            config.webrtc.rtcp_mux_policy,
        );

        config
    }

    /// Absolute REST base URL
    pub fn api_url(&self) -> String {
        let base = self.api_base_url.trim();
        if base.starts_with("http://") || base.starts_with("https://") {
            return base.trim_end_matches('/').to_string();
        }
        format!(
            "{}/{}",
            self.api_origin.trim_end_matches('/'),
            base.trim_start_matches('/')
        )
        .trim_end_matches('/')
        .to_string()
    }

    /// REST client for [`GlobalConfig::api_url`]
    pub fn api_client(&self) -> Result<ApiClient, BVisionError> {
        ApiClient::new(self.api_url())
    }
}

fn parsed<T>(raw: Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {} value {:?} ({}), using default", key, raw, e);
            default
        }),
    }
}
