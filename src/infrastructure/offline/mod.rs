mod mappers;
pub mod metrics;
mod rows;
pub mod sqlite_metadata_store;
pub mod sqlite_queue_store;
pub mod sqlite_record_store;

pub use metrics::{PassOutcomeStatus, SyncMetrics, SyncMetricsSnapshot};
pub use sqlite_metadata_store::SqliteSyncMetadataStore;
pub use sqlite_queue_store::SqliteSyncQueueStore;
pub use sqlite_record_store::SqliteSyncRecordStore;
