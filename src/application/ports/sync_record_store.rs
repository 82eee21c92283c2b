use crate::domain::value_objects::{EntityId, EntityType};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Read access to the `synced` flag of business records.
///
/// The flag is written by the queue store together with the queue row, so it
/// always agrees with whether a change is still queued.
#[async_trait]
pub trait SyncRecordStore: Send + Sync {
    /// `None` when the record does not exist locally, which is normal after a delete.
    async fn is_synced(
        &self,
        entity_type: EntityType,
        entity_id: &EntityId,
    ) -> Result<Option<bool>, AppError>;
}
