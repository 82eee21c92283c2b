use super::rows::SyncMetadataRow;
use crate::application::ports::SyncMetadataStore;
use crate::domain::entities::SyncMetadata;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

const SYNC_STATE_KEY: &str = "sync_state";

pub struct SqliteSyncMetadataStore {
    pool: Pool<Sqlite>,
}

impl SqliteSyncMetadataStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncMetadataStore for SqliteSyncMetadataStore {
    async fn load_metadata(&self) -> Result<SyncMetadata, AppError> {
        let row = sqlx::query_as::<_, SyncMetadataRow>(
            "SELECT value FROM sync_metadata WHERE key = ?1",
        )
        .bind(SYNC_STATE_KEY)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(serde_json::from_str(&row.value)?),
            None => Ok(SyncMetadata::default()),
        }
    }

    async fn save_metadata(&self, metadata: &SyncMetadata) -> Result<(), AppError> {
        let value = serde_json::to_string(metadata)?;
        sqlx::query(
            r#"
            INSERT INTO sync_metadata (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(SYNC_STATE_KEY)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
