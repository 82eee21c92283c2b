pub mod offline;

pub use offline::{
    EntityId, EntityType, SyncOperation, SyncPayload, SyncQueueId, SyncQueueStatus,
};
