use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassSkipReason {
    Offline,
    AlreadySyncing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPassReport {
    pub pass_id: String,
    /// Items handed to a remote-apply handler.
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Permanently failed items left alone by this pass.
    pub skipped_exhausted: u32,
    /// Items applied remotely but re-enqueued meanwhile; they stay queued.
    pub superseded: u32,
    /// Set when connectivity dropped and the remaining batches were not started.
    pub interrupted: bool,
    /// Shortest backoff among items that failed this pass and may still be retried.
    pub retry_after: Option<Duration>,
    pub duration: Duration,
}

impl SyncPassReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SyncPassOutcome {
    Skipped { reason: PassSkipReason },
    Completed { report: SyncPassReport },
}

impl SyncPassOutcome {
    pub fn skipped(reason: PassSkipReason) -> Self {
        SyncPassOutcome::Skipped { reason }
    }

    pub fn report(&self) -> Option<&SyncPassReport> {
        match self {
            SyncPassOutcome::Completed { report } => Some(report),
            SyncPassOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncPassOutcome::Skipped { .. })
    }
}
