pub mod sync_metadata;
pub mod sync_pass;
pub mod sync_queue_item;
pub mod sync_status_snapshot;

pub use sync_metadata::SyncMetadata;
pub use sync_pass::{PassSkipReason, SyncPassOutcome, SyncPassReport};
pub use sync_queue_item::SyncQueueItem;
pub use sync_status_snapshot::SyncStatusSnapshot;
