use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncQueueStatus {
    /// Waiting for the next pass.
    Pending,
    /// Retry budget exhausted or rejected by the backend. Kept for manual review.
    Failed,
}

impl SyncQueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncQueueStatus::Pending => "pending",
            SyncQueueStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncQueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for SyncQueueStatus {
    fn from(value: &str) -> Self {
        match value {
            "failed" => SyncQueueStatus::Failed,
            _ => SyncQueueStatus::Pending,
        }
    }
}
