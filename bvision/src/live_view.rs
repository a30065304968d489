//! Live view tile arena
//!
//! One [`StreamSessionManager`] per open tile, keyed by device key. Closing
//! the view (or dropping it) stops every session.

use bvision_core::{BVisionError, Device};
use bvision_signaling::{
    NullSurface, PeerConnectionFactory, RtcConfiguration, SessionEvent, SessionSnapshot,
    SignalingTransport, StreamSessionManager, VideoSurface,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Hands out the video surface of a tile
pub trait SurfaceProvider: Send + Sync {
    /// Surface for the tile showing `device`
    fn surface_for(&self, device: &Device) -> Arc<dyn VideoSurface>;
}

/// Provider that discards media
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurfaces;

impl SurfaceProvider for NullSurfaces {
    fn surface_for(&self, _device: &Device) -> Arc<dyn VideoSurface> {
        Arc::new(NullSurface)
    }
}

/// Builder for [`LiveView`]
pub struct LiveViewBuilder {
    transport: Option<Arc<dyn SignalingTransport>>,
    factory: Option<Arc<dyn PeerConnectionFactory>>,
    rtc_config: RtcConfiguration,
    hub_key: String,
    surfaces: Arc<dyn SurfaceProvider>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl LiveViewBuilder {
    /// Builder relaying through hub `hub_key`
    pub fn new(hub_key: impl Into<String>) -> Self {
        Self {
            transport: None,
            factory: None,
            rtc_config: RtcConfiguration::default(),
            hub_key: hub_key.into(),
            surfaces: Arc::new(NullSurfaces),
            events: None,
        }
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

    /// Peer connection configuration shared by every tile
    pub fn rtc_config(mut self, config: RtcConfiguration) -> Self {
        self.rtc_config = config;
        self
    }

    /// Where tiles get their surfaces
    pub fn surfaces(mut self, surfaces: Arc<dyn SurfaceProvider>) -> Self {
        self.surfaces = surfaces;
        self
    }

    /// Channel receiving the events of every tile
    pub fn events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the view
    pub fn build(self) -> Result<LiveView, BVisionError> {
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
        Ok(LiveView {
            transport,
            factory,
            rtc_config: self.rtc_config,
            hub_key: self.hub_key,
            surfaces: self.surfaces,
            events: self.events,
            tiles: Mutex::new(HashMap::new()),
        })
    }
}

/// Grid of live tiles
pub struct LiveView {
    transport: Arc<dyn SignalingTransport>,
    factory: Arc<dyn PeerConnectionFactory>,
    rtc_config: RtcConfiguration,
    hub_key: String,
    surfaces: Arc<dyn SurfaceProvider>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    tiles: Mutex<HashMap<String, Arc<StreamSessionManager>>>,
}

impl LiveView {
    /// Create a builder
    pub fn builder(hub_key: impl Into<String>) -> LiveViewBuilder {
        LiveViewBuilder::new(hub_key)
    }

    /// Hub the tiles relay through
    pub fn hub_key(&self) -> &str {
        &self.hub_key
    }

    /// Open (or restart) the tile for `device`
    pub async fn open_tile(&self, device: &Device) -> Result<(), BVisionError> {
        self.open_tile_at(device, Utc::now()).await
    }

    /// Open the tile for `device`, judging its heartbeat at `now`.
    ///
    /// Offline devices are refused with [`BVisionError::DeviceOffline`]. An
    /// already open tile is started again, which does nothing while its
    /// session is live.
    pub async fn open_tile_at(
        &self,
        device: &Device,
        now: DateTime<Utc>,
    ) -> Result<(), BVisionError> {
        let key = device.signaling_key().to_string();
        if !device.is_online_at(now) {
            debug!("Not opening tile for offline device {}", key);
            return Err(BVisionError::DeviceOffline { device_key: key });
        }

        let manager = {
            let mut tiles = self.tiles.lock();
            match tiles.get(&key) {
                Some(manager) => manager.clone(),
                None => {
                    let manager = Arc::new(self.new_manager(device)?);
                    tiles.insert(key.clone(), manager.clone());
                    info!("Opened tile for {}", key);
                    manager
                }
            }
        };

        manager.start(device, &self.hub_key).await
    }

    /// Stop and remove one tile. Returns whether it was open.
    pub fn close_tile(&self, device_key: &str) -> bool {
        let removed = self.tiles.lock().remove(device_key);
        match removed {
            Some(manager) => {
                manager.stop();
                info!("Closed tile for {}", device_key);
                true
            }
            None => false,
        }
    }

    /// Stop and remove every tile
    pub fn close_all(&self) {
        let tiles: Vec<_> = self.tiles.lock().drain().collect();
        if tiles.is_empty() {
            return;
        }
        for (_, manager) in &tiles {
            manager.stop();
        }
        info!("Closed {} tiles", tiles.len());
    }

    /// Session of an open tile
    pub fn tile(&self, device_key: &str) -> Option<Arc<StreamSessionManager>> {
        self.tiles.lock().get(device_key).cloned()
    }

    /// Keys of the open tiles, sorted
    pub fn open_tiles(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tiles.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of open tiles
    pub fn len(&self) -> usize {
        self.tiles.lock().len()
    }

    /// Whether no tile is open
    pub fn is_empty(&self) -> bool {
        self.tiles.lock().is_empty()
    }

    /// Snapshots of every open tile, sorted by device key
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let managers: Vec<_> = self.tiles.lock().values().cloned().collect();
        let mut snapshots: Vec<_> = managers.iter().map(|m| m.snapshot()).collect();
        snapshots.sort_by(|a, b| a.device_key.cmp(&b.device_key));
        snapshots
    }

    /// Health of the open tiles at `now`
    #[cfg(feature = "diagnostics")]
    pub fn health(&self, now: DateTime<Utc>) -> bvision_diagnostics::HealthSummary {
        bvision_diagnostics::ConnectionAnalyzer::new().summarize(&self.snapshots(), now)
    }

    fn new_manager(&self, device: &Device) -> Result<StreamSessionManager, BVisionError> {
        let mut builder = StreamSessionManager::builder()
            .transport(self.transport.clone())
            .peer_factory(self.factory.clone())
            .rtc_config(self.rtc_config.clone())
            .surface(self.surfaces.surface_for(device));
        if let Some(events) = &self.events {
            builder = builder.events(events.clone());
        }
        builder.build()
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl std::fmt::Debug for LiveView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveView")
            .field("hub_key", &self.hub_key)
            .field("tiles", &self.open_tiles())
            .finish()
    }
}
