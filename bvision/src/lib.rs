//! # BVision - Client for the BVision Hub surveillance platform
//!
//! BVision talks to the BVision Hub backend: it lists devices and their
//! heartbeat status, browses recordings, manages sites, groups, roles and
//! users, and negotiates live camera streams over the hub's signaling relay.
//!
//! ## Key Features
//!
//! - **Live view**: one WebRTC session per tile, negotiated through the relay
//! - **Device directory**: 60 second heartbeat freshness as online status
//! - **Management**: validated forms for groups, roles, users and sites
//! - **Recordings**: paged, filterable recording browser
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bvision::BVision;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = BVision::init()?;
//!     hub.auth().sign_in("operator", "secret").await?;
//!
//!     let online = hub.devices().online_devices(chrono::Utc::now()).await?;
//!     println!("{} devices online", online.len());
//!
//!     let mut recordings = hub.recordings();
//!     recordings.fetch().await?;
//!     println!("{}", recordings.summary());
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use bvision_core::{
    BVisionError, Device, DeviceStatus, EntityForm, EntityKind, EntityPayload, EntityRecord,
    FieldError, FormMode, Group, GroupForm, Permission, Recording, RecordingCard, Role, RoleForm,
    Site, SiteForm, User, UserForm, UserInfo, ValidationErrors, HEARTBEAT_FRESHNESS,
};

pub use bvision_api::{
    ApiClient, DeviceService, DeviceSource, EntityGateway, RecordingQuery, RecordingService,
    RecordingSource,
};

pub use bvision_signaling::{
    HttpRelay, IceCandidateInit, IceServer, MediaTrack, MemoryRelay, PeerConnection,
    PeerConnectionFactory, PeerConnectionState, PeerEvent, RtcConfiguration, SessionEvent,
    SessionSnapshot, SignalingEnvelope, SignalingTransport, StreamSessionManager, VideoSurface,
};

#[cfg(feature = "diagnostics")]
pub use bvision_diagnostics::{
    init_logging, ConnectionAnalyzer, ConnectionInfo, DebugLogger, HealthSummary,
};

// Public API modules
pub mod auth;
pub mod config;
pub mod directory;
pub mod editor;
pub mod live_view;
pub mod recordings;
pub mod workbench;

// Re-export main API types
pub use auth::{AuthBasis, AuthCheck, AuthSession};
pub use config::{GlobalConfig, RouterMode, WebRtcConfig, APP_NAME};
pub use directory::DeviceDirectory;
pub use editor::{dialog_title, EntityEditor};
pub use live_view::{LiveView, LiveViewBuilder, NullSurfaces, SurfaceProvider};
pub use recordings::RecordingsBrowser;
pub use workbench::{device_rows, DeviceRow, DeviceTab, WorkbenchSummary};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Main entry point for BVision
#[derive(Debug, Clone)]
pub struct BVision {
    inner: Arc<BVisionInner>,
}

#[derive(Debug)]
struct BVisionInner {
    config: GlobalConfig,
    client: ApiClient,
    auth: AuthSession,
}

impl BVision {
    /// Initialize from `BVISION_*` environment variables
    ///
    /// # Example
    /// ```rust,no_run
    /// use bvision::BVision;
    ///
    /// let hub = BVision::init()?;
    /// # Ok::<(), bvision::BVisionError>(())
    /// ```
    pub fn init() -> Result<Self, BVisionError> {
        Self::init_with(GlobalConfig::from_env())
    }

    /// Initialize with an explicit configuration
    pub fn init_with(config: GlobalConfig) -> Result<Self, BVisionError> {
        let client = config.api_client()?;
        info!(
            "{} {} using {}",
            config.app_name,
            config.app_version,
            client.base_url()
        );
        let auth = AuthSession::new(client.clone());
        Ok(Self {
            inner: Arc::new(BVisionInner {
                config,
                client,
                auth,
            }),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    /// Shared REST client
    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// Sign-in state
    pub fn auth(&self) -> &AuthSession {
        &self.inner.auth
    }

    /// Device directory backed by the REST client
    pub fn devices(&self) -> DeviceDirectory<DeviceService> {
        DeviceDirectory::new(self.inner.client.devices())
    }

    /// Fresh recordings browser on page 1
    pub fn recordings(&self) -> RecordingsBrowser<RecordingService> {
        RecordingsBrowser::new(self.inner.client.recordings())
    }

    /// Management editor writing through the REST client
    pub fn editor(&self) -> EntityEditor<ApiClient> {
        EntityEditor::new(self.inner.client.clone())
    }

    /// Dashboard counts at `now`
    pub async fn workbench(&self, now: DateTime<Utc>) -> Result<WorkbenchSummary, BVisionError> {
        WorkbenchSummary::load(&self.inner.client, now).await
    }

    /// Relay publishing through the backend. Inbound delivery starts with
    /// [`HttpRelay::connect_inbound`], see [`BVision::connect_relay`].
    pub fn relay(&self) -> HttpRelay {
        HttpRelay::new(self.inner.client.webrtc())
    }

    /// Relay with its inbound WebSocket connected to the configured
    /// `signaling_url`
    pub async fn connect_relay(&self) -> Result<Arc<HttpRelay>, BVisionError> {
        let url = self.inner.config.signaling_url.as_deref().ok_or_else(|| {
            BVisionError::MissingConfiguration {
                field: "signaling_url".to_string(),
            }
        })?;
        let relay = Arc::new(self.relay());
        relay.connect_inbound(url).await?;
        Ok(relay)
    }

    /// Live view builder preset with the configured hub and peer settings
    ///
    /// # Example
    /// ```rust,no_run
    /// use bvision::BVision;
    /// use std::sync::Arc;
    ///
    /// # async fn example(
    /// #     factory: Arc<dyn bvision::PeerConnectionFactory>,
    /// # ) -> Result<(), bvision::BVisionError> {
    /// let hub = BVision::init()?;
    /// let relay = hub.connect_relay().await?;
    /// let view = hub.live_view().transport(relay).peer_factory(factory).build()?;
    /// for device in hub.devices().online_devices(chrono::Utc::now()).await? {
    ///     view.open_tile(&device).await?;
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn live_view(&self) -> LiveViewBuilder {
        LiveView::builder(self.inner.config.hub_key.clone())
            .rtc_config(self.inner.config.webrtc.clone())
    }
}
