use crate::domain::entities::{PassSkipReason, SyncPassReport};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcomeStatus {
    Clean,
    WithFailures,
    Skipped,
    Aborted,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub passes_completed: u64,
    pub passes_skipped: u64,
    pub passes_aborted: u64,
    pub items_succeeded: u64,
    pub items_failed: u64,
    /// Completed passes in a row that had at least one failed item.
    pub consecutive_failing_passes: u64,
    pub last_clean_pass_ms: Option<u64>,
    pub last_outcome: Option<PassOutcomeStatus>,
    pub last_pass_id: Option<String>,
    pub last_skip_reason: Option<PassSkipReason>,
    pub last_error: Option<String>,
    pub last_duration_ms: Option<u64>,
    pub last_timestamp_ms: Option<u64>,
}

#[derive(Default, Clone)]
struct LastPassMetadata {
    outcome: Option<PassOutcomeStatus>,
    pass_id: Option<String>,
    skip_reason: Option<PassSkipReason>,
    error: Option<String>,
    duration_ms: Option<u64>,
    timestamp_ms: Option<u64>,
}

/// Per-engine counters for sync passes.
pub struct SyncMetrics {
    completed: AtomicU64,
    skipped: AtomicU64,
    aborted: AtomicU64,
    items_succeeded: AtomicU64,
    items_failed: AtomicU64,
    consecutive_failing: AtomicU64,
    last_clean_ms: AtomicU64,
    metadata: Mutex<LastPassMetadata>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            completed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
            items_succeeded: AtomicU64::new(0),
            items_failed: AtomicU64::new(0),
            consecutive_failing: AtomicU64::new(0),
            last_clean_ms: AtomicU64::new(0),
            metadata: Mutex::new(LastPassMetadata::default()),
        }
    }

    pub fn record_pass(&self, report: &SyncPassReport) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.items_succeeded
            .fetch_add(u64::from(report.succeeded), Ordering::Relaxed);
        self.items_failed
            .fetch_add(u64::from(report.failed), Ordering::Relaxed);

        let outcome = if report.has_failures() {
            self.consecutive_failing.fetch_add(1, Ordering::Relaxed);
            PassOutcomeStatus::WithFailures
        } else {
            self.consecutive_failing.store(0, Ordering::Relaxed);
            self.last_clean_ms.store(current_unix_ms(), Ordering::Relaxed);
            PassOutcomeStatus::Clean
        };

        self.store_metadata(LastPassMetadata {
            outcome: Some(outcome),
            pass_id: Some(report.pass_id.clone()),
            skip_reason: None,
            error: None,
            duration_ms: Some(report.duration.as_millis() as u64),
            timestamp_ms: Some(current_unix_ms()),
        });
    }

    pub fn record_skip(&self, reason: PassSkipReason) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.store_metadata(LastPassMetadata {
            outcome: Some(PassOutcomeStatus::Skipped),
            skip_reason: Some(reason),
            timestamp_ms: Some(current_unix_ms()),
            ..LastPassMetadata::default()
        });
    }

    pub fn record_error(&self, pass_id: &str, error: &str) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
        self.store_metadata(LastPassMetadata {
            outcome: Some(PassOutcomeStatus::Aborted),
            pass_id: Some(pass_id.to_string()),
            error: Some(error.to_string()),
            timestamp_ms: Some(current_unix_ms()),
            ..LastPassMetadata::default()
        });
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let metadata = self
            .metadata
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        SyncMetricsSnapshot {
            passes_completed: self.completed.load(Ordering::Relaxed),
            passes_skipped: self.skipped.load(Ordering::Relaxed),
            passes_aborted: self.aborted.load(Ordering::Relaxed),
            items_succeeded: self.items_succeeded.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            consecutive_failing_passes: self.consecutive_failing.load(Ordering::Relaxed),
            last_clean_pass_ms: to_option(self.last_clean_ms.load(Ordering::Relaxed)),
            last_outcome: metadata.outcome,
            last_pass_id: metadata.pass_id,
            last_skip_reason: metadata.skip_reason,
            last_error: metadata.error,
            last_duration_ms: metadata.duration_ms,
            last_timestamp_ms: metadata.timestamp_ms,
        }
    }

    fn store_metadata(&self, value: LastPassMetadata) {
        if let Ok(mut guard) = self.metadata.lock() {
            *guard = value;
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
