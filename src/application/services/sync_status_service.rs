use crate::application::ports::{Connectivity, SyncMetadataStore, SyncQueueStore};
use crate::application::services::sync_executor::ExecutorState;
use crate::domain::entities::SyncStatusSnapshot;
use crate::shared::error::AppError;
use crate::shared::listeners::{ListenerRegistry, Subscription};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Watcher {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    connectivity_subscription: Subscription,
}

/// Read-side projection of the sync state for the UI.
///
/// Holds only the latest snapshot. Observers are notified when a refresh
/// produces a different snapshot.
pub struct SyncStatusService {
    queue: Arc<dyn SyncQueueStore>,
    metadata: Arc<dyn SyncMetadataStore>,
    connectivity: Arc<dyn Connectivity>,
    executor_state: watch::Receiver<ExecutorState>,
    snapshot: watch::Sender<SyncStatusSnapshot>,
    listeners: ListenerRegistry<SyncStatusSnapshot>,
    watcher: Mutex<Option<Watcher>>,
}

impl SyncStatusService {
    pub fn new(
        queue: Arc<dyn SyncQueueStore>,
        metadata: Arc<dyn SyncMetadataStore>,
        connectivity: Arc<dyn Connectivity>,
        executor_state: watch::Receiver<ExecutorState>,
    ) -> Self {
        let initial = SyncStatusSnapshot {
            is_online: connectivity.is_online(),
            is_syncing: *executor_state.borrow() == ExecutorState::Syncing,
            ..SyncStatusSnapshot::default()
        };
        let (snapshot, _) = watch::channel(initial);
        Self {
            queue,
            metadata,
            connectivity,
            executor_state,
            snapshot,
            listeners: ListenerRegistry::new(),
            watcher: Mutex::new(None),
        }
    }

    /// Freshly computed status. Does not notify observers.
    pub async fn get_status(&self) -> Result<SyncStatusSnapshot, AppError> {
        let counts = self.queue.counts().await?;
        let metadata = self.metadata.load_metadata().await?;
        Ok(SyncStatusSnapshot {
            is_online: self.connectivity.is_online(),
            is_syncing: *self.executor_state.borrow() == ExecutorState::Syncing,
            pending_count: counts.total,
            failed_count: counts.failed,
            last_sync_at: metadata.last_sync_at,
        })
    }

    /// Last published snapshot.
    pub fn current(&self) -> SyncStatusSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Recomputes the status and publishes it if it changed.
    pub async fn refresh(&self) -> Result<SyncStatusSnapshot, AppError> {
        let next = self.get_status().await?;
        let changed = self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });

        if changed {
            tracing::debug!(
                target: "sync::status",
                online = next.is_online,
                syncing = next.is_syncing,
                pending = next.pending_count,
                failed = next.failed_count,
                "sync status changed"
            );
            self.listeners.notify(&next);
        }
        Ok(next)
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SyncStatusSnapshot) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn watch(&self) -> watch::Receiver<SyncStatusSnapshot> {
        self.snapshot.subscribe()
    }

    /// Refreshes on every connectivity transition and executor state change.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut guard = match self.watcher.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        if guard.is_some() {
            return false;
        }

        let dirty = Arc::new(Notify::new());
        let connectivity_subscription = {
            let dirty = Arc::clone(&dirty);
            self.connectivity
                .on_change(Box::new(move |_online| dirty.notify_one()))
        };

        let cancel = CancellationToken::new();
        let service = Arc::clone(self);
        let mut executor_state = self.executor_state.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = service.refresh().await {
                tracing::warn!(target: "sync::status", error = %err, "initial status refresh failed");
            }
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = executor_state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = dirty.notified() => {}
                }
                if let Err(err) = service.refresh().await {
                    tracing::warn!(target: "sync::status", error = %err, "status refresh failed");
                }
            }
        });

        *guard = Some(Watcher {
            cancel,
            handle,
            connectivity_subscription,
        });
        true
    }

    pub async fn stop(&self) {
        let watcher = match self.watcher.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(watcher) = watcher {
            watcher.connectivity_subscription.unsubscribe();
            watcher.cancel.cancel();
            let _ = watcher.handle.await;
        }
    }
}
