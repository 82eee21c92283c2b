use crate::domain::entities::SyncQueueItem;
use crate::domain::value_objects::SyncQueueId;
use crate::shared::error::AppError;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    /// All queued items, whatever their status.
    pub total: u64,
    pub failed: u64,
}

/// Durable store of pending mutations, keyed by item id.
///
/// Every write is atomic per item. Implementations must survive a process restart.
#[async_trait]
pub trait SyncQueueStore: Send + Sync {
    /// Inserts the item, or coalesces it into the pending item with the same id,
    /// and flags the originating record unsynced in the same transaction.
    /// Returns the row as stored.
    async fn enqueue(&self, item: SyncQueueItem) -> Result<SyncQueueItem, AppError>;

    /// All queued items ordered by `enqueued_at`, oldest first.
    async fn all(&self) -> Result<Vec<SyncQueueItem>, AppError>;

    async fn get(&self, id: &SyncQueueId) -> Result<Option<SyncQueueItem>, AppError>;

    /// Permanently failed items, oldest first.
    async fn failed(&self) -> Result<Vec<SyncQueueItem>, AppError>;

    /// Removing an unknown id is a no-op.
    async fn remove(&self, id: &SyncQueueId) -> Result<(), AppError>;

    /// Removes the item only if it was not rewritten since it was read, and
    /// flags the originating record synced in the same transaction.
    /// Returns `false` when a newer mutation replaced it; the flag is then left alone.
    async fn remove_applied(&self, item: &SyncQueueItem) -> Result<bool, AppError>;

    /// Replaces the stored item if its revision still matches.
    /// Returns `false` when a newer mutation replaced it.
    async fn update(&self, item: &SyncQueueItem) -> Result<bool, AppError>;

    async fn counts(&self) -> Result<QueueCounts, AppError>;
}
