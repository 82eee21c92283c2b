use super::rows::SyncQueueItemRow;
use crate::domain::entities::SyncQueueItem;
use crate::domain::value_objects::{
    EntityId, EntityType, SyncOperation, SyncPayload, SyncQueueId, SyncQueueStatus,
};
use crate::shared::error::AppError;
use chrono::{DateTime, TimeZone, Utc};

pub fn sync_queue_item_from_row(row: SyncQueueItemRow) -> Result<SyncQueueItem, AppError> {
    let SyncQueueItemRow {
        id,
        entity_type,
        entity_id,
        operation,
        payload,
        status,
        attempts,
        last_error,
        enqueued_at,
        modified_at,
        revision,
    } = row;

    Ok(SyncQueueItem {
        id: SyncQueueId::new(id).map_err(AppError::DeserializationError)?,
        entity_type: entity_type
            .parse::<EntityType>()
            .map_err(AppError::DeserializationError)?,
        entity_id: EntityId::new(entity_id).map_err(AppError::DeserializationError)?,
        operation: operation
            .parse::<SyncOperation>()
            .map_err(AppError::DeserializationError)?,
        payload: SyncPayload::from_json_str(&payload).map_err(AppError::DeserializationError)?,
        status: SyncQueueStatus::from(status.as_str()),
        attempts: u32::try_from(attempts.max(0)).unwrap_or(u32::MAX),
        last_error,
        enqueued_at: datetime_from_millis(enqueued_at)?,
        modified_at: datetime_from_millis(modified_at)?,
        revision,
    })
}

pub fn payload_to_column(payload: &SyncPayload) -> Result<String, AppError> {
    serde_json::to_string(payload.as_json()).map_err(AppError::from)
}

pub fn datetime_from_millis(millis: i64) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        AppError::DeserializationError(format!("Invalid timestamp (millis): {millis}"))
    })
}

pub fn datetime_to_millis(value: &DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}
