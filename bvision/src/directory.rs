//! Device directory with heartbeat-derived status

use bvision_api::DeviceSource;
use bvision_core::{BVisionError, Device, DeviceStatus};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Devices as listed by the backend, with status computed on every read
#[derive(Debug, Clone)]
pub struct DeviceDirectory<D> {
    source: D,
}

impl<D: DeviceSource> DeviceDirectory<D> {
    /// Directory over `source`, usually `ApiClient::devices()`
    pub fn new(source: D) -> Self {
        Self { source }
    }

    /// Every registered device
    pub async fn list(&self) -> Result<Vec<Device>, BVisionError> {
        self.source.list_devices().await
    }

    /// Number of registered devices
    pub async fn count(&self) -> Result<u64, BVisionError> {
        self.source.count_devices().await
    }

    /// One device by id
    pub async fn get(&self, id: &str) -> Result<Device, BVisionError> {
        self.source.device(id).await
    }

    /// Devices whose heartbeat is fresh at `now`, in backend order
    pub async fn online_devices(&self, now: DateTime<Utc>) -> Result<Vec<Device>, BVisionError> {
        let devices = self.list().await?;
        let total = devices.len();
        let online: Vec<Device> = devices
            .into_iter()
            .filter(|d| d.is_online_at(now))
            .collect();
        debug!("{} of {} devices online", online.len(), total);
        Ok(online)
    }

    /// Every device paired with its status at `now`
    pub async fn with_status(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Device, DeviceStatus)>, BVisionError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .map(|d| {
                let status = d.status_at(now);
                (d, status)
            })
            .collect())
    }
}
