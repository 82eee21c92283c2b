pub mod retry_policy;
pub mod sync_engine;
pub mod sync_executor;
pub mod sync_status_service;

pub use retry_policy::RetryPolicy;
pub use sync_engine::SyncEngine;
pub use sync_executor::{ExecutorOptions, ExecutorState, SyncExecutor};
pub use sync_status_service::SyncStatusService;
