use crate::domain::value_objects::offline::{
    EntityId, EntityType, SyncOperation, SyncPayload, SyncQueueId, SyncQueueStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A local mutation waiting to be applied remotely.
///
/// `revision` is owned by the queue store: it changes on every write of the
/// row, which lets the executor detect that an item was re-enqueued while it
/// was in flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncQueueItem {
    pub id: SyncQueueId,
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub operation: SyncOperation,
    pub payload: SyncPayload,
    pub status: SyncQueueStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub revision: i64,
}

impl SyncQueueItem {
    /// Builds a fresh item for a record mutation. The record id is taken from the payload.
    pub fn pending(
        entity_type: EntityType,
        operation: SyncOperation,
        payload: SyncPayload,
        now: DateTime<Utc>,
    ) -> Result<Self, String> {
        let entity_id = payload.entity_id()?;
        Ok(Self::for_entity(entity_type, entity_id, operation, payload, now))
    }

    pub fn for_entity(
        entity_type: EntityType,
        entity_id: EntityId,
        operation: SyncOperation,
        payload: SyncPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SyncQueueId::for_entity(entity_type, &entity_id),
            entity_type,
            entity_id,
            operation,
            payload,
            status: SyncQueueStatus::Pending,
            attempts: 0,
            last_error: None,
            enqueued_at: now,
            modified_at: now,
            revision: 0,
        }
    }

    pub fn is_permanently_failed(&self) -> bool {
        self.status == SyncQueueStatus::Failed
    }
}
