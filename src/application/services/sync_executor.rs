use crate::application::ports::{
    Connectivity, RemoteApplyError, RemoteApplyRegistry, SyncMetadataStore, SyncPassRunner,
    SyncQueueStore,
};
use crate::application::services::retry_policy::RetryPolicy;
use crate::domain::entities::{
    PassSkipReason, SyncMetadata, SyncPassOutcome, SyncPassReport, SyncQueueItem,
};
use crate::infrastructure::offline::SyncMetrics;
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    Idle,
    Syncing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    pub batch_size: usize,
    pub remote_timeout: Duration,
}

impl ExecutorOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1) as usize,
            remote_timeout: config.remote_timeout(),
        }
    }
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Drains the sync queue against the remote-apply handlers.
///
/// At most one pass runs at a time. Items are sent in FIFO batches; a batch is
/// dispatched concurrently and fully settled before the next one starts.
pub struct SyncExecutor {
    queue: Arc<dyn SyncQueueStore>,
    metadata: Arc<dyn SyncMetadataStore>,
    connectivity: Arc<dyn Connectivity>,
    handlers: RemoteApplyRegistry,
    policy: RetryPolicy,
    options: ExecutorOptions,
    metrics: Arc<SyncMetrics>,
    gate: Mutex<()>,
    state: watch::Sender<ExecutorState>,
}

impl SyncExecutor {
    pub fn new(
        queue: Arc<dyn SyncQueueStore>,
        metadata: Arc<dyn SyncMetadataStore>,
        connectivity: Arc<dyn Connectivity>,
        handlers: RemoteApplyRegistry,
        policy: RetryPolicy,
        options: ExecutorOptions,
    ) -> Self {
        let (state, _) = watch::channel(ExecutorState::Idle);
        Self {
            queue,
            metadata,
            connectivity,
            handlers,
            policy,
            options,
            metrics: Arc::new(SyncMetrics::new()),
            gate: Mutex::new(()),
            state,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> ExecutorState {
        *self.state.borrow()
    }

    pub fn is_syncing(&self) -> bool {
        self.state() == ExecutorState::Syncing
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ExecutorState> {
        self.state.subscribe()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn metrics(&self) -> Arc<SyncMetrics> {
        Arc::clone(&self.metrics)
    }

    /// One pass over the queue.
    ///
    /// Returns `Skipped` without touching anything when offline or when a pass
    /// is already running. Per-item failures are recorded on the items; only a
    /// storage failure makes this return `Err`.
    pub async fn run_sync_pass(&self) -> Result<SyncPassOutcome, AppError> {
        if !self.connectivity.is_online() {
            return Ok(self.skip(PassSkipReason::Offline));
        }
        let gate = match self.gate.try_lock() {
            Ok(gate) => gate,
            Err(_) => return Ok(self.skip(PassSkipReason::AlreadySyncing)),
        };
        let _pass = PassGuard::enter(gate, &self.state);

        let pass_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        tracing::info!(target: "sync::executor", pass_id = %pass_id, "sync pass started");

        match self.drain(&pass_id, started).await {
            Ok(report) => {
                self.metrics.record_pass(&report);
                tracing::info!(
                    target: "sync::executor",
                    pass_id = %report.pass_id,
                    attempted = report.attempted,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    skipped_exhausted = report.skipped_exhausted,
                    superseded = report.superseded,
                    interrupted = report.interrupted,
                    duration_ms = report.duration.as_millis() as u64,
                    "sync pass completed"
                );
                Ok(SyncPassOutcome::Completed { report })
            }
            Err(err) => {
                self.metrics.record_error(&pass_id, &err.to_string());
                tracing::error!(
                    target: "sync::executor",
                    pass_id = %pass_id,
                    error = %err,
                    "sync pass aborted"
                );
                Err(err)
            }
        }
    }

    fn skip(&self, reason: PassSkipReason) -> SyncPassOutcome {
        self.metrics.record_skip(reason);
        tracing::debug!(target: "sync::executor", reason = ?reason, "sync pass skipped");
        SyncPassOutcome::skipped(reason)
    }

    async fn drain(&self, pass_id: &str, started: Instant) -> Result<SyncPassReport, AppError> {
        let items = self.queue.all().await?;
        let (eligible, exhausted): (Vec<SyncQueueItem>, Vec<SyncQueueItem>) = items
            .into_iter()
            .partition(|item| self.policy.should_retry(item));

        let mut report = SyncPassReport {
            pass_id: pass_id.to_string(),
            skipped_exhausted: exhausted.len() as u32,
            ..SyncPassReport::default()
        };

        for batch in eligible.chunks(self.options.batch_size.max(1)) {
            if !self.connectivity.is_online() {
                report.interrupted = true;
                tracing::warn!(
                    target: "sync::executor",
                    pass_id = %pass_id,
                    remaining = eligible.len() as u32 - report.attempted,
                    "connectivity lost, stopping pass"
                );
                break;
            }

            let results = join_all(batch.iter().map(|item| self.dispatch(item))).await;
            for (item, result) in batch.iter().zip(results) {
                self.apply_result(item, result, &mut report).await?;
            }
        }

        self.persist_metadata(&report).await?;
        report.duration = started.elapsed();
        Ok(report)
    }

    async fn dispatch(&self, item: &SyncQueueItem) -> Result<(), RemoteApplyError> {
        let timeout = self.options.remote_timeout;
        let call = self
            .handlers
            .apply(item.entity_type, item.operation, &item.payload);
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteApplyError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Settles one dispatched item. The only place a pass removes or rewrites queue rows.
    async fn apply_result(
        &self,
        item: &SyncQueueItem,
        result: Result<(), RemoteApplyError>,
        report: &mut SyncPassReport,
    ) -> Result<(), AppError> {
        report.attempted += 1;

        match result {
            Ok(()) => {
                report.succeeded += 1;
                if self.queue.remove_applied(item).await? {
                    tracing::debug!(
                        target: "sync::executor",
                        id = %item.id,
                        operation = %item.operation,
                        "item applied"
                    );
                } else {
                    // Re-enqueued while in flight; the newer mutation stays queued
                    // and the record stays unsynced.
                    report.superseded += 1;
                    tracing::debug!(
                        target: "sync::executor",
                        id = %item.id,
                        "item applied but superseded by a newer mutation"
                    );
                }
            }
            Err(error) => {
                report.failed += 1;
                let updated = self.policy.record_failure(item, &error, Utc::now());
                let retryable = self.policy.should_retry(&updated);
                if retryable {
                    let delay = self.policy.next_delay(updated.attempts);
                    report.retry_after = Some(match report.retry_after {
                        Some(current) => current.min(delay),
                        None => delay,
                    });
                }

                let stored = self.queue.update(&updated).await?;
                tracing::warn!(
                    target: "sync::executor",
                    id = %item.id,
                    attempts = updated.attempts,
                    retryable,
                    stored,
                    error = %error,
                    "remote apply failed"
                );
            }
        }
        Ok(())
    }

    async fn persist_metadata(&self, report: &SyncPassReport) -> Result<(), AppError> {
        let counts = self.queue.counts().await?;
        let metadata = SyncMetadata {
            last_sync_at: Some(Utc::now()),
            pending_count: counts.total,
            failed_count: counts.failed,
            last_pass_failures: report.failed,
        };
        self.metadata.save_metadata(&metadata).await
    }
}

#[async_trait]
impl SyncPassRunner for SyncExecutor {
    async fn run_pass(&self) -> Result<SyncPassOutcome, AppError> {
        self.run_sync_pass().await
    }
}

/// Holds the pass gate and publishes `Syncing` for its lifetime.
struct PassGuard<'a> {
    gate: Option<MutexGuard<'a, ()>>,
    state: &'a watch::Sender<ExecutorState>,
}

impl<'a> PassGuard<'a> {
    fn enter(gate: MutexGuard<'a, ()>, state: &'a watch::Sender<ExecutorState>) -> Self {
        state.send_replace(ExecutorState::Syncing);
        Self {
            gate: Some(gate),
            state,
        }
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        // Release the gate first so an `Idle` observer can start the next pass.
        self.gate.take();
        self.state.send_replace(ExecutorState::Idle);
    }
}
