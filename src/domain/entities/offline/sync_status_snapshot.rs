use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the UI shows: "N pending changes", last sync time and a spinner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusSnapshot {
    pub is_online: bool,
    pub is_syncing: bool,
    /// Every queued item, permanently failed ones included.
    pub pending_count: u64,
    pub failed_count: u64,
    pub last_sync_at: Option<DateTime<Utc>>,
}
