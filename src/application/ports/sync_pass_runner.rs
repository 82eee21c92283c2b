use crate::domain::entities::SyncPassOutcome;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Something the scheduler can ask to drain the queue once.
#[async_trait]
pub trait SyncPassRunner: Send + Sync {
    async fn run_pass(&self) -> Result<SyncPassOutcome, AppError>;
}
