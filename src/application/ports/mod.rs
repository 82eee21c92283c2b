pub mod connectivity;
pub mod remote_apply;
pub mod sync_metadata_store;
pub mod sync_pass_runner;
pub mod sync_queue_store;
pub mod sync_record_store;

pub use connectivity::Connectivity;
pub use remote_apply::{RemoteApplyError, RemoteApplyHandler, RemoteApplyRegistry};
pub use sync_metadata_store::SyncMetadataStore;
pub use sync_pass_runner::SyncPassRunner;
pub use sync_queue_store::{QueueCounts, SyncQueueStore};
pub use sync_record_store::SyncRecordStore;
