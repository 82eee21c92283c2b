use crate::application::ports::{
    Connectivity, RemoteApplyRegistry, SyncMetadataStore, SyncQueueStore, SyncRecordStore,
};
use crate::application::services::retry_policy::RetryPolicy;
use crate::application::services::sync_executor::{ExecutorOptions, SyncExecutor};
use crate::application::services::sync_status_service::SyncStatusService;
use crate::domain::entities::{SyncPassOutcome, SyncQueueItem, SyncStatusSnapshot};
use crate::domain::value_objects::{
    EntityId, EntityType, SyncOperation, SyncPayload, SyncQueueId,
};
use crate::infrastructure::database::DbPool;
use crate::infrastructure::jobs::{delay_after, ScheduleIntervals, SchedulerCommand, SyncScheduler};
use crate::infrastructure::offline::{
    SqliteSyncMetadataStore, SqliteSyncQueueStore, SqliteSyncRecordStore, SyncMetricsSnapshot,
};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use crate::shared::listeners::Subscription;
use chrono::Utc;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// The offline sync engine: one instance per application.
///
/// Collaborators enqueue local mutations here and observe the derived status;
/// the engine drains the queue when connectivity returns, on a timer and on
/// request.
pub struct SyncEngine {
    config: SyncConfig,
    queue: Arc<dyn SyncQueueStore>,
    records: Arc<dyn SyncRecordStore>,
    connectivity: Arc<dyn Connectivity>,
    executor: Arc<SyncExecutor>,
    status: Arc<SyncStatusService>,
    scheduler: SyncScheduler,
    online_subscription: Mutex<Option<Subscription>>,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<dyn SyncQueueStore>,
        records: Arc<dyn SyncRecordStore>,
        metadata: Arc<dyn SyncMetadataStore>,
        connectivity: Arc<dyn Connectivity>,
        handlers: RemoteApplyRegistry,
        config: &SyncConfig,
    ) -> Self {
        let executor = Arc::new(SyncExecutor::new(
            Arc::clone(&queue),
            Arc::clone(&metadata),
            Arc::clone(&connectivity),
            handlers,
            RetryPolicy::from_config(config),
            ExecutorOptions::from_config(config),
        ));
        let status = Arc::new(SyncStatusService::new(
            Arc::clone(&queue),
            metadata,
            Arc::clone(&connectivity),
            executor.subscribe_state(),
        ));
        let scheduler = SyncScheduler::new(
            executor.clone(),
            ScheduleIntervals::from_config(config),
        );

        Self {
            config: config.clone(),
            queue,
            records,
            connectivity,
            executor,
            status,
            scheduler,
            online_subscription: Mutex::new(None),
        }
    }

    /// Engine over the SQLite stores sharing `pool`.
    pub fn from_pool(
        pool: DbPool,
        connectivity: Arc<dyn Connectivity>,
        handlers: RemoteApplyRegistry,
        config: &SyncConfig,
    ) -> Self {
        Self::new(
            Arc::new(SqliteSyncQueueStore::new(pool.clone())),
            Arc::new(SqliteSyncRecordStore::new(pool.clone())),
            Arc::new(SqliteSyncMetadataStore::new(pool)),
            connectivity,
            handlers,
            config,
        )
    }

    /// Starts status tracking and, with `auto_sync`, the timer and the
    /// online trigger. Returns `false` if already started.
    pub fn start(&self) -> bool {
        let status_started = self.status.start();
        if !self.config.auto_sync {
            tracing::info!(target: "sync::scheduler", "auto sync disabled");
            return status_started;
        }

        if !self.scheduler.start(Duration::ZERO) {
            return false;
        }
        if let Some(commands) = self.scheduler.command_sender() {
            let subscription = self.connectivity.on_change(Box::new(move |online| {
                if online {
                    let _ = commands.send(SchedulerCommand::RunNow);
                }
            }));
            if let Ok(mut guard) = self.online_subscription.lock() {
                if let Some(previous) = guard.replace(subscription) {
                    previous.unsubscribe();
                }
            }
        }
        true
    }

    /// Stops every background task. `start` may be called again afterwards.
    pub async fn shutdown(&self) {
        let subscription = match self.online_subscription.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        self.scheduler.shutdown().await;
        self.status.stop().await;
    }

    /// Records a local mutation: queues the change and flags the record unsynced
    /// in one write.
    ///
    /// `payload` must be an object whose `id` field names the record.
    pub async fn enqueue_change(
        &self,
        entity_type: EntityType,
        operation: SyncOperation,
        payload: Value,
    ) -> Result<SyncQueueItem, AppError> {
        let payload = SyncPayload::new(payload).map_err(AppError::ValidationError)?;
        let item = SyncQueueItem::pending(entity_type, operation, payload, Utc::now())
            .map_err(AppError::ValidationError)?;

        let stored = self.queue.enqueue(item).await?;

        tracing::info!(
            target: "sync::queue",
            id = %stored.id,
            operation = %stored.operation,
            revision = stored.revision,
            "change enqueued"
        );
        self.refresh_status().await;
        Ok(stored)
    }

    /// Runs a pass right away, then restarts the timer from the pass outcome.
    ///
    /// A skipped call leaves the timer alone: when it lost the race to a
    /// scheduled pass, that pass sets the next delay.
    pub async fn force_sync_now(&self) -> Result<SyncPassOutcome, AppError> {
        tracing::info!(target: "sync::executor", "manual sync requested");
        let result = self.executor.run_sync_pass().await;
        let ran = !matches!(result, Ok(SyncPassOutcome::Skipped { .. }));
        if ran && self.scheduler.is_running() {
            self.scheduler
                .reschedule(delay_after(&result, self.scheduler.intervals()));
        }
        self.refresh_status().await;
        result
    }

    pub fn subscribe_sync_status<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SyncStatusSnapshot) + Send + Sync + 'static,
    {
        self.status.subscribe(callback)
    }

    pub async fn status(&self) -> Result<SyncStatusSnapshot, AppError> {
        self.status.get_status().await
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatusSnapshot> {
        self.status.watch()
    }

    /// Local `synced` flag of a record, `None` if it does not exist.
    pub async fn is_record_synced(
        &self,
        entity_type: EntityType,
        entity_id: &EntityId,
    ) -> Result<Option<bool>, AppError> {
        self.records.is_synced(entity_type, entity_id).await
    }

    pub async fn pending_items(&self) -> Result<Vec<SyncQueueItem>, AppError> {
        self.queue.all().await
    }

    pub async fn failed_items(&self) -> Result<Vec<SyncQueueItem>, AppError> {
        self.queue.failed().await
    }

    /// Gives a permanently failed item a fresh retry budget.
    pub async fn retry_failed(&self, id: &SyncQueueId) -> Result<SyncQueueItem, AppError> {
        let item = self
            .queue
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Queue item {id} not found")))?;

        let reset = self.executor.policy().reset(&item, Utc::now());
        let current = if self.queue.update(&reset).await? {
            self.queue.get(id).await?.unwrap_or(reset)
        } else {
            // A newer mutation replaced it, which already carries a fresh budget.
            self.queue.get(id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Queue item {id} not found"))
            })?
        };

        tracing::info!(target: "sync::queue", id = %id, "failed item reset for retry");
        self.scheduler.trigger_now();
        self.refresh_status().await;
        Ok(current)
    }

    /// Drops a queued item without applying it. The record stays unsynced.
    pub async fn discard(&self, id: &SyncQueueId) -> Result<bool, AppError> {
        if self.queue.get(id).await?.is_none() {
            return Ok(false);
        }
        self.queue.remove(id).await?;
        tracing::warn!(target: "sync::queue", id = %id, "queued change discarded");
        self.refresh_status().await;
        Ok(true)
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.executor.metrics().snapshot()
    }

    pub fn executor(&self) -> Arc<SyncExecutor> {
        Arc::clone(&self.executor)
    }

    pub fn status_service(&self) -> Arc<SyncStatusService> {
        Arc::clone(&self.status)
    }

    async fn refresh_status(&self) {
        if let Err(err) = self.status.refresh().await {
            tracing::warn!(target: "sync::status", error = %err, "status refresh failed");
        }
    }
}
