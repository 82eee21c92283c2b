use crate::domain::entities::SyncMetadata;
use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait SyncMetadataStore: Send + Sync {
    async fn load_metadata(&self) -> Result<SyncMetadata, AppError>;
    async fn save_metadata(&self, metadata: &SyncMetadata) -> Result<(), AppError>;
}
