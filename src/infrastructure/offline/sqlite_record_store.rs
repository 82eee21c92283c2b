use super::mappers::datetime_to_millis;
use crate::application::ports::SyncRecordStore;
use crate::domain::value_objects::{EntityId, EntityType};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqliteConnection};

/// `synced` flag access over the business record tables.
///
/// Table names come from `EntityType::table_name`, a closed set, so they are
/// formatted into the statements directly.
pub struct SqliteSyncRecordStore {
    pool: Pool<Sqlite>,
}

impl SqliteSyncRecordStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

/// Flags the record unsynced. Runs on the caller's connection so the queue
/// write and the flag commit together.
pub(super) async fn flag_pending(
    conn: &mut SqliteConnection,
    entity_type: EntityType,
    entity_id: &EntityId,
    modified_at: DateTime<Utc>,
) -> Result<bool, AppError> {
    let sql = format!(
        "UPDATE {} SET synced = 0, modified_at = ?1 WHERE id = ?2",
        entity_type.table_name()
    );
    let result = sqlx::query(&sql)
        .bind(datetime_to_millis(&modified_at))
        .bind(entity_id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(super) async fn flag_synced(
    conn: &mut SqliteConnection,
    entity_type: EntityType,
    entity_id: &EntityId,
) -> Result<bool, AppError> {
    let sql = format!(
        "UPDATE {} SET synced = 1 WHERE id = ?1",
        entity_type.table_name()
    );
    let result = sqlx::query(&sql)
        .bind(entity_id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl SyncRecordStore for SqliteSyncRecordStore {
    async fn is_synced(
        &self,
        entity_type: EntityType,
        entity_id: &EntityId,
    ) -> Result<Option<bool>, AppError> {
        let sql = format!(
            "SELECT synced FROM {} WHERE id = ?1",
            entity_type.table_name()
        );
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(entity_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(synced,)| synced != 0))
    }
}
