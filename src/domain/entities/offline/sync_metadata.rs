use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate bookkeeping persisted after every completed pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub pending_count: u64,
    pub failed_count: u64,
    pub last_pass_failures: u32,
}
