pub mod entity_id;
pub mod entity_type;
pub mod sync_operation;
pub mod sync_payload;
pub mod sync_queue_id;
pub mod sync_queue_status;

pub use entity_id::EntityId;
pub use entity_type::EntityType;
pub use sync_operation::SyncOperation;
pub use sync_payload::SyncPayload;
pub use sync_queue_id::SyncQueueId;
pub use sync_queue_status::SyncQueueStatus;
