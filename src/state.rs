use crate::application::ports::RemoteApplyRegistry;
use crate::application::services::SyncEngine;
use crate::infrastructure::database::{Database, DbPool};
use crate::infrastructure::network::{ConnectivityMonitor, TcpConnectivityProbe};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything the host application keeps alive for offline sync.
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub engine: Arc<SyncEngine>,
    recheck: Option<(CancellationToken, JoinHandle<()>)>,
}

impl AppState {
    /// Opens the database, builds the engine and starts its background tasks.
    ///
    /// `initially_online` is the platform's connectivity reading at startup.
    pub async fn initialize(
        config: AppConfig,
        handlers: RemoteApplyRegistry,
        initially_online: bool,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;

        let db_pool = Database::initialize(&config.database).await?;
        let connectivity = Arc::new(ConnectivityMonitor::new(initially_online));
        let engine = Arc::new(SyncEngine::from_pool(
            db_pool.clone(),
            connectivity.clone(),
            handlers,
            &config.sync,
        ));

        // 疎通確認プローブ（設定されている場合のみ）
        let recheck = config.connectivity.probe_address().map(|address| {
            tracing::info!(
                target: "sync::connectivity",
                address = %address,
                interval_secs = config.connectivity.recheck_interval_secs,
                "connectivity probe enabled"
            );
            let probe = Arc::new(TcpConnectivityProbe::new(
                address,
                config.connectivity.probe_timeout(),
            ));
            let cancel = CancellationToken::new();
            let handle = connectivity.spawn_recheck(
                probe,
                config.connectivity.recheck_interval(),
                cancel.clone(),
            );
            (cancel, handle)
        });

        engine.start();

        Ok(Self {
            config,
            db_pool,
            connectivity,
            engine,
            recheck,
        })
    }

    pub async fn shutdown(mut self) {
        self.engine.shutdown().await;
        if let Some((cancel, handle)) = self.recheck.take() {
            cancel.cancel();
            let _ = handle.await;
        }
        self.db_pool.close().await;
        tracing::info!(target: "sync::executor", "sync engine shut down");
    }
}
