use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay before every retry.
    #[default]
    Flat,
    /// Delay doubles with every failed attempt, capped by `max_backoff_secs`.
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval_secs: u64,
    pub retry_delay_secs: u64,
    pub max_retries: u32,
    pub batch_size: u32,
    pub remote_timeout_secs: u64,
    #[serde(default)]
    pub backoff: BackoffStrategy,
    pub max_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    #[serde(default)]
    pub probe_host: Option<String>,
    #[serde(default)]
    pub probe_port: Option<u16>,
    pub recheck_interval_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            sync: SyncConfig::default(),
            connectivity: ConnectivityConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: 5,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval_secs: 300, // 5 minutes
            retry_delay_secs: 30,
            max_retries: 3,
            batch_size: 10,
            remote_timeout_secs: 10,
            backoff: BackoffStrategy::Flat,
            max_backoff_secs: 600,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_host: None,
            probe_port: None,
            recheck_interval_secs: 60,
            probe_timeout_secs: 5,
        }
    }
}

impl SyncConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

impl ConnectivityConfig {
    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// `host:port` of the reachability probe, when both halves are configured.
    pub fn probe_address(&self) -> Option<String> {
        match (&self.probe_host, self.probe_port) {
            (Some(host), Some(port)) if !host.trim().is_empty() => {
                Some(format!("{}:{}", host.trim(), port))
            }
            _ => None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        // 既定値
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("VISTORIA_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = env_u64("VISTORIA_DATABASE_MAX_CONNECTIONS") {
            cfg.database.max_connections = value.clamp(1, u32::MAX as u64) as u32;
        }

        if let Ok(v) = std::env::var("VISTORIA_SYNC_AUTO") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_u64("VISTORIA_SYNC_INTERVAL_SECS") {
            cfg.sync.sync_interval_secs = value.max(1);
        }
        if let Some(value) = env_u64("VISTORIA_SYNC_RETRY_DELAY_SECS") {
            cfg.sync.retry_delay_secs = value.max(1);
        }
        if let Some(value) = env_u64("VISTORIA_SYNC_MAX_RETRIES") {
            cfg.sync.max_retries = value.min(u32::MAX as u64) as u32;
        }
        if let Some(value) = env_u64("VISTORIA_SYNC_BATCH_SIZE") {
            cfg.sync.batch_size = value.clamp(1, u32::MAX as u64) as u32;
        }
        if let Some(value) = env_u64("VISTORIA_SYNC_REMOTE_TIMEOUT_SECS") {
            cfg.sync.remote_timeout_secs = value.max(1);
        }
        if let Ok(v) = std::env::var("VISTORIA_SYNC_BACKOFF") {
            cfg.sync.backoff = parse_backoff(&v, cfg.sync.backoff);
        }
        if let Some(value) = env_u64("VISTORIA_SYNC_MAX_BACKOFF_SECS") {
            cfg.sync.max_backoff_secs = value.max(1);
        }

        if let Ok(v) = std::env::var("VISTORIA_PROBE_HOST") {
            let host = v.trim();
            cfg.connectivity.probe_host = if host.is_empty() {
                None
            } else {
                Some(host.to_string())
            };
        }
        if let Ok(v) = std::env::var("VISTORIA_PROBE_PORT") {
            cfg.connectivity.probe_port = parse_u16(&v).filter(|port| *port != 0);
        }
        if let Some(value) = env_u64("VISTORIA_CONNECTIVITY_RECHECK_SECS") {
            cfg.connectivity.recheck_interval_secs = value.max(1);
        }
        if let Some(value) = env_u64("VISTORIA_PROBE_TIMEOUT_SECS") {
            cfg.connectivity.probe_timeout_secs = value.max(1);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.batch_size == 0 {
            return Err("Sync batch_size must be greater than 0".to_string());
        }
        if self.sync.sync_interval_secs == 0 {
            return Err("Sync sync_interval_secs must be greater than 0".to_string());
        }
        if self.sync.retry_delay_secs == 0 {
            return Err("Sync retry_delay_secs must be greater than 0".to_string());
        }
        if self.sync.remote_timeout_secs == 0 {
            return Err("Sync remote_timeout_secs must be greater than 0".to_string());
        }
        if self.sync.backoff == BackoffStrategy::Exponential && self.sync.max_backoff_secs == 0 {
            return Err("Sync max_backoff_secs must be greater than 0".to_string());
        }
        if self.connectivity.recheck_interval_secs == 0 {
            return Err("Connectivity recheck_interval_secs must be greater than 0".to_string());
        }
        if self.connectivity.probe_timeout_secs == 0 {
            return Err("Connectivity probe_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn default_database_url() -> String {
    match dirs::data_local_dir() {
        Some(dir) => format!(
            "sqlite://{}?mode=rwc",
            dir.join("vistoria").join("vistoria.db").display()
        ),
        None => "sqlite:data/vistoria.db?mode=rwc".to_string(),
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| parse_u64(&v))
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_backoff(s: &str, default: BackoffStrategy) -> BackoffStrategy {
    match s.trim().to_ascii_lowercase().as_str() {
        "flat" | "fixed" => BackoffStrategy::Flat,
        "exponential" | "exp" => BackoffStrategy::Exponential,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u16(value: &str) -> Option<u16> {
    value.trim().parse::<u16>().ok()
}
