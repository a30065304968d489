use super::item_path;
use crate::client::ApiClient;
use bvision_core::{BVisionError, Site, SitePayload};

/// Site collection path
pub const SITES_PATH: &str = "/sites";

/// `/sites` endpoints
#[derive(Debug, Clone)]
pub struct SiteService {
    client: ApiClient,
}

impl SiteService {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All sites
    pub async fn list(&self) -> Result<Vec<Site>, BVisionError> {
        self.client.get(SITES_PATH).await
    }

    /// One site by identifier
    pub async fn get(&self, id: &str) -> Result<Site, BVisionError> {
        self.client.get(&item_path(SITES_PATH, id)).await
    }

    /// Create a site
    pub async fn create(&self, body: &SitePayload) -> Result<Site, BVisionError> {
        self.client.post(SITES_PATH, body).await
    }

    /// Update a site
    pub async fn update(&self, id: &str, body: &SitePayload) -> Result<Site, BVisionError> {
        self.client.patch(&item_path(SITES_PATH, id), body).await
    }

    /// Delete a site
    pub async fn delete(&self, id: &str) -> Result<(), BVisionError> {
        self.client.delete(&item_path(SITES_PATH, id)).await
    }
}
