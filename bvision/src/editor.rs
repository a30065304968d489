//! Management editor: validate locally, then write through the gateway

use bvision_api::EntityGateway;
use bvision_core::{BVisionError, EntityForm, EntityKind, EntityRecord, FormMode};
use tracing::{debug, info};

/// Dialog title for a form, e.g. `Create group` or `Edit user`
pub fn dialog_title(kind: EntityKind, mode: &FormMode) -> String {
    match mode {
        FormMode::Create => format!("Create {kind}"),
        FormMode::Update { .. } => format!("Edit {kind}"),
    }
}

/// Submits management forms
#[derive(Debug, Clone)]
pub struct EntityEditor<G> {
    gateway: G,
}

impl<G: EntityGateway> EntityEditor<G> {
    /// Editor writing through `gateway`, usually an `ApiClient`
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Gateway the editor writes through
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Validate `form` and store it. Validation failures return
    /// [`BVisionError::Validation`] without any network call.
    pub async fn submit(
        &self,
        form: &EntityForm,
        mode: &FormMode,
    ) -> Result<EntityRecord, BVisionError> {
        let payload = form.validate(mode).map_err(|errors| {
            debug!("{} form rejected: {}", form.kind(), errors);
            BVisionError::from(errors)
        })?;

        let record = match mode {
            FormMode::Create => self.gateway.create(&payload).await?,
            FormMode::Update { id } => self.gateway.update(id, &payload).await?,
        };
        info!("Saved {} {}", payload.kind(), record.id());
        Ok(record)
    }

    /// Delete a record
    pub async fn remove(&self, kind: EntityKind, id: &str) -> Result<(), BVisionError> {
        self.gateway.delete(kind, id).await?;
        info!("Deleted {} {}", kind, id);
        Ok(())
    }
}
