use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncQueueItemRow {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub operation: String,
    pub payload: String,
    pub status: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub enqueued_at: i64,
    pub modified_at: i64,
    pub revision: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct QueueCountsRow {
    pub total: i64,
    pub failed: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SyncMetadataRow {
    pub value: String,
}
