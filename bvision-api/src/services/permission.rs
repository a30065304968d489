use crate::client::ApiClient;
use bvision_core::{BVisionError, Permission};

/// Permission collection path
pub const PERMISSIONS_PATH: &str = "/permissions";

/// `/permissions` endpoint (read-only)
#[derive(Debug, Clone)]
pub struct PermissionService {
    client: ApiClient,
}

impl PermissionService {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All permissions known to the backend
    pub async fn list(&self) -> Result<Vec<Permission>, BVisionError> {
        self.client.get(PERMISSIONS_PATH).await
    }
}
