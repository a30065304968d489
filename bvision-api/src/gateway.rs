//! Entity-kind dispatch for management editors

use crate::client::ApiClient;
use async_trait::async_trait;
use bvision_core::{BVisionError, EntityKind, EntityPayload, EntityRecord};

/// Create, update and delete for any managed entity kind
#[async_trait]
pub trait EntityGateway: Send + Sync {
    /// Store a new record
    async fn create(&self, payload: &EntityPayload) -> Result<EntityRecord, BVisionError>;

    /// Overwrite fields of an existing record
    async fn update(&self, id: &str, payload: &EntityPayload)
        -> Result<EntityRecord, BVisionError>;

    /// Remove a record
    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), BVisionError>;
}

#[async_trait]
impl EntityGateway for ApiClient {
    async fn create(&self, payload: &EntityPayload) -> Result<EntityRecord, BVisionError> {
        Ok(match payload {
            EntityPayload::Group(body) => EntityRecord::Group(self.groups().create(body).await?),
            EntityPayload::Role(body) => EntityRecord::Role(self.roles().create(body).await?),
            EntityPayload::User(body) => EntityRecord::User(self.users().create(body).await?),
            EntityPayload::Site(body) => EntityRecord::Site(self.sites().create(body).await?),
        })
    }

    async fn update(
        &self,
        id: &str,
        payload: &EntityPayload,
    ) -> Result<EntityRecord, BVisionError> {
        Ok(match payload {
            EntityPayload::Group(body) => {
                EntityRecord::Group(self.groups().update(id, body).await?)
            }
            EntityPayload::Role(body) => EntityRecord::Role(self.roles().update(id, body).await?),
            EntityPayload::User(body) => EntityRecord::User(self.users().update(id, body).await?),
            EntityPayload::Site(body) => EntityRecord::Site(self.sites().update(id, body).await?),
        })
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), BVisionError> {
        match kind {
            EntityKind::Group => self.groups().delete(id).await,
            EntityKind::Role => self.roles().delete(id).await,
            EntityKind::User => self.users().delete(id).await,
            EntityKind::Site => self.sites().delete(id).await,
        }
    }
}
