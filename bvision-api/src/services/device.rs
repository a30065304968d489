use super::item_path;
use crate::client::ApiClient;
use async_trait::async_trait;
use bvision_core::{BVisionError, CountRes, Device};

/// Device collection path
pub const DEVICES_PATH: &str = "/devices";

/// Read access to the device directory
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// All registered devices
    async fn list_devices(&self) -> Result<Vec<Device>, BVisionError>;

    /// Number of registered devices
    async fn count_devices(&self) -> Result<u64, BVisionError>;

    /// One device by backend identifier
    async fn device(&self, id: &str) -> Result<Device, BVisionError>;
}

/// `/devices` endpoints
#[derive(Debug, Clone)]
pub struct DeviceService {
    client: ApiClient,
}

impl DeviceService {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeviceSource for DeviceService {
    async fn list_devices(&self) -> Result<Vec<Device>, BVisionError> {
        self.client.get(DEVICES_PATH).await
    }

    async fn count_devices(&self) -> Result<u64, BVisionError> {
        let res: CountRes = self.client.get(&format!("{DEVICES_PATH}/count")).await?;
        Ok(res.count)
    }

    async fn device(&self, id: &str) -> Result<Device, BVisionError> {
        self.client.get(&item_path(DEVICES_PATH, id)).await
    }
}
