use super::item_path;
use crate::client::ApiClient;
use bvision_core::{BVisionError, Group, GroupPayload};

/// Group collection path
pub const GROUPS_PATH: &str = "/groups";

/// `/groups` endpoints
#[derive(Debug, Clone)]
pub struct GroupService {
    client: ApiClient,
}

impl GroupService {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All groups
    pub async fn list(&self) -> Result<Vec<Group>, BVisionError> {
        self.client.get(GROUPS_PATH).await
    }

    /// One group by identifier
    pub async fn get(&self, id: &str) -> Result<Group, BVisionError> {
        self.client.get(&item_path(GROUPS_PATH, id)).await
    }

    /// Create a group
    pub async fn create(&self, body: &GroupPayload) -> Result<Group, BVisionError> {
        self.client.post(GROUPS_PATH, body).await
    }

    /// Update a group
    pub async fn update(&self, id: &str, body: &GroupPayload) -> Result<Group, BVisionError> {
        self.client.patch(&item_path(GROUPS_PATH, id), body).await
    }

    /// Delete a group
    pub async fn delete(&self, id: &str) -> Result<(), BVisionError> {
        self.client.delete(&item_path(GROUPS_PATH, id)).await
    }
}
