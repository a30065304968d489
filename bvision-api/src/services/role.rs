use super::item_path;
use crate::client::ApiClient;
use bvision_core::{BVisionError, Role, RolePayload};

/// Role collection path
pub const ROLES_PATH: &str = "/roles";

/// `/roles` endpoints
#[derive(Debug, Clone)]
pub struct RoleService {
    client: ApiClient,
}

impl RoleService {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All roles
    pub async fn list(&self) -> Result<Vec<Role>, BVisionError> {
        self.client.get(ROLES_PATH).await
    }

    /// One role by identifier
    pub async fn get(&self, id: &str) -> Result<Role, BVisionError> {
        self.client.get(&item_path(ROLES_PATH, id)).await
    }

    /// Create a role
    pub async fn create(&self, body: &RolePayload) -> Result<Role, BVisionError> {
        self.client.post(ROLES_PATH, body).await
    }

    /// Update a role
    pub async fn update(&self, id: &str, body: &RolePayload) -> Result<Role, BVisionError> {
        self.client.patch(&item_path(ROLES_PATH, id), body).await
    }

    /// Delete a role
    pub async fn delete(&self, id: &str) -> Result<(), BVisionError> {
        self.client.delete(&item_path(ROLES_PATH, id)).await
    }
}
