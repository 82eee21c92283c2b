//! Offline-first synchronization engine for field inspection data.
//!
//! Local mutations are queued durably in SQLite and replayed against
//! per-entity remote handlers when connectivity allows.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{
    Connectivity, RemoteApplyError, RemoteApplyHandler, RemoteApplyRegistry,
};
pub use application::services::{ExecutorState, RetryPolicy, SyncEngine};
pub use domain::entities::{
    PassSkipReason, SyncPassOutcome, SyncPassReport, SyncQueueItem, SyncStatusSnapshot,
};
pub use domain::value_objects::{EntityType, SyncOperation, SyncPayload, SyncQueueId};
pub use infrastructure::network::ConnectivityMonitor;
pub use shared::{AppConfig, AppError, Result, Subscription};
pub use state::AppState;

/// Installs the fmt subscriber. `RUST_LOG` overrides the default filter.
/// Later calls are ignored.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vistoria_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
