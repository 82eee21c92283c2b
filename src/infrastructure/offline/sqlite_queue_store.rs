use super::mappers::{datetime_to_millis, payload_to_column, sync_queue_item_from_row};
use super::rows::{QueueCountsRow, SyncQueueItemRow};
use super::sqlite_record_store::{flag_pending, flag_synced};
use crate::application::ports::{QueueCounts, SyncQueueStore};
use crate::domain::entities::SyncQueueItem;
use crate::domain::value_objects::{SyncQueueId, SyncQueueStatus};
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite, SqliteConnection};

const SELECT_COLUMNS: &str = r#"
    SELECT id, entity_type, entity_id, operation, payload, status, attempts,
           last_error, enqueued_at, modified_at, revision
    FROM sync_queue
"#;

pub struct SqliteSyncQueueStore {
    pool: Pool<Sqlite>,
}

impl SqliteSyncQueueStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn fetch_one(
        conn: &mut SqliteConnection,
        id: &SyncQueueId,
    ) -> Result<Option<SyncQueueItem>, AppError> {
        let row = sqlx::query_as::<_, SyncQueueItemRow>(&format!(
            "{SELECT_COLUMNS} WHERE id = ?1"
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        row.map(sync_queue_item_from_row).transpose()
    }

    async fn upsert_pending(
        conn: &mut SqliteConnection,
        item: &SyncQueueItem,
    ) -> Result<SyncQueueItem, AppError> {
        let payload = payload_to_column(&item.payload)?;
        let modified_at = datetime_to_millis(&item.modified_at);

        match Self::fetch_one(conn, &item.id).await? {
            Some(current) => {
                let operation = current.operation.coalesce(item.operation);

                sqlx::query(
                    r#"
                    UPDATE sync_queue
                    SET operation = ?1, payload = ?2, status = ?3, attempts = 0,
                        last_error = NULL, modified_at = ?4, revision = revision + 1
                    WHERE id = ?5
                    "#,
                )
                .bind(operation.as_str())
                .bind(&payload)
                .bind(SyncQueueStatus::Pending.as_str())
                .bind(modified_at)
                .bind(item.id.as_str())
                .execute(&mut *conn)
                .await?;

                tracing::debug!(
                    target: "sync::queue",
                    id = %item.id,
                    previous = %current.operation,
                    operation = %operation,
                    "coalesced pending mutation"
                );
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO sync_queue (
                        id, entity_type, entity_id, operation, payload, status,
                        attempts, last_error, enqueued_at, modified_at, revision
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, ?8, 1)
                    "#,
                )
                .bind(item.id.as_str())
                .bind(item.entity_type.as_str())
                .bind(item.entity_id.as_str())
                .bind(item.operation.as_str())
                .bind(&payload)
                .bind(SyncQueueStatus::Pending.as_str())
                .bind(datetime_to_millis(&item.enqueued_at))
                .bind(modified_at)
                .execute(&mut *conn)
                .await?;

                tracing::debug!(
                    target: "sync::queue",
                    id = %item.id,
                    operation = %item.operation,
                    "enqueued mutation"
                );
            }
        }

        Self::fetch_one(conn, &item.id).await?.ok_or_else(|| {
            AppError::Storage(format!("Queue item {} vanished during enqueue", item.id))
        })
    }

    /// Commits on success, rolls back otherwise.
    async fn finish<T>(
        conn: &mut SqliteConnection,
        result: Result<T, AppError>,
        action: &str,
    ) -> Result<T, AppError> {
        match result {
            Ok(value) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    tracing::warn!(
                        target: "sync::queue",
                        action,
                        error = %rollback_err,
                        "failed to roll back"
                    );
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl SyncQueueStore for SqliteSyncQueueStore {
    async fn enqueue(&self, item: SyncQueueItem) -> Result<SyncQueueItem, AppError> {
        // Read-modify-write of one row; take the write lock up front.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = async {
            flag_pending(&mut conn, item.entity_type, &item.entity_id, item.modified_at).await?;
            let stored = Self::upsert_pending(&mut conn, &item).await?;
            Ok::<_, AppError>(stored)
        }
        .await;
        Self::finish(&mut conn, result, "enqueue").await
    }

    async fn all(&self) -> Result<Vec<SyncQueueItem>, AppError> {
        let rows = sqlx::query_as::<_, SyncQueueItemRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY enqueued_at ASC, rowid ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(sync_queue_item_from_row).collect()
    }

    async fn get(&self, id: &SyncQueueId) -> Result<Option<SyncQueueItem>, AppError> {
        let row = sqlx::query_as::<_, SyncQueueItemRow>(&format!(
            "{SELECT_COLUMNS} WHERE id = ?1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(sync_queue_item_from_row).transpose()
    }

    async fn failed(&self) -> Result<Vec<SyncQueueItem>, AppError> {
        let rows = sqlx::query_as::<_, SyncQueueItemRow>(&format!(
            "{SELECT_COLUMNS} WHERE status = ?1 ORDER BY enqueued_at ASC, rowid ASC"
        ))
        .bind(SyncQueueStatus::Failed.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(sync_queue_item_from_row).collect()
    }

    async fn remove(&self, id: &SyncQueueId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sync_queue WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_applied(&self, item: &SyncQueueItem) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = async {
            let deleted = sqlx::query("DELETE FROM sync_queue WHERE id = ?1 AND revision = ?2")
                .bind(item.id.as_str())
                .bind(item.revision)
                .execute(&mut *conn)
                .await?
                .rows_affected()
                == 1;
            if deleted {
                let flagged = flag_synced(&mut conn, item.entity_type, &item.entity_id).await?;
                tracing::debug!(
                    target: "sync::queue",
                    id = %item.id,
                    record_flagged = flagged,
                    "applied mutation removed"
                );
            }
            Ok::<_, AppError>(deleted)
        }
        .await;
        Self::finish(&mut conn, result, "remove_applied").await
    }

    async fn update(&self, item: &SyncQueueItem) -> Result<bool, AppError> {
        let payload = payload_to_column(&item.payload)?;
        let result = sqlx::query(
            r#"
            UPDATE sync_queue
            SET operation = ?1, payload = ?2, status = ?3, attempts = ?4,
                last_error = ?5, modified_at = ?6, revision = revision + 1
            WHERE id = ?7 AND revision = ?8
            "#,
        )
        .bind(item.operation.as_str())
        .bind(&payload)
        .bind(item.status.as_str())
        .bind(i64::from(item.attempts))
        .bind(&item.last_error)
        .bind(datetime_to_millis(&item.modified_at))
        .bind(item.id.as_str())
        .bind(item.revision)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn counts(&self) -> Result<QueueCounts, AppError> {
        let row = sqlx::query_as::<_, QueueCountsRow>(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN status = ?1 THEN 1 ELSE 0 END), 0) AS failed
            FROM sync_queue
            "#,
        )
        .bind(SyncQueueStatus::Failed.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(QueueCounts {
            total: row.total.max(0) as u64,
            failed: row.failed.max(0) as u64,
        })
    }
}
