pub mod offline;

pub use offline::{
    PassSkipReason, SyncMetadata, SyncPassOutcome, SyncPassReport, SyncQueueItem,
    SyncStatusSnapshot,
};
