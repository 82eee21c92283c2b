pub mod ports;
pub mod services;

pub use services::{RetryPolicy, SyncEngine, SyncExecutor, SyncStatusService};
