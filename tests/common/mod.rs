#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vistoria_sync::infrastructure::database::Database;
use vistoria_sync::shared::config::SyncConfig;
use vistoria_sync::{
    EntityType, RemoteApplyError, RemoteApplyHandler, RemoteApplyRegistry, SyncOperation,
    SyncPayload,
};

pub async fn setup_pool() -> Pool<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    Database::run_migrations(&pool).await.expect("migrations");
    pool
}

/// Deterministic config for tests: no timer, three tries, flat 30s backoff.
pub fn test_sync_config() -> SyncConfig {
    SyncConfig {
        auto_sync: false,
        remote_timeout_secs: 5,
        ..SyncConfig::default()
    }
}

pub async fn insert_record(pool: &Pool<Sqlite>, entity_type: EntityType, id: &str, synced: bool) {
    sqlx::query(&format!(
        "INSERT INTO {} (id, data, synced, modified_at) VALUES (?1, '{{}}', ?2, 0)",
        entity_type.table_name()
    ))
    .bind(id)
    .bind(synced)
    .execute(pool)
    .await
    .expect("insert record");
}

pub async fn record_synced(pool: &Pool<Sqlite>, entity_type: EntityType, id: &str) -> Option<bool> {
    let row: Option<(i64,)> = sqlx::query_as(&format!(
        "SELECT synced FROM {} WHERE id = ?1",
        entity_type.table_name()
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .expect("select record");
    row.map(|(synced,)| synced != 0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub operation: SyncOperation,
    pub payload: Value,
}

/// Remote handler that succeeds unless the payload id is in its failure list.
#[derive(Default)]
pub struct ScriptedHandler {
    calls: Mutex<Vec<RemoteCall>>,
    failing: Mutex<HashMap<String, RemoteApplyError>>,
    delay: Option<Duration>,
}

impl ScriptedHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn fail_id(&self, id: &str, error: RemoteApplyError) {
        self.failing
            .lock()
            .expect("failing lock")
            .insert(id.to_string(), error);
    }

    pub fn heal_id(&self, id: &str) {
        self.failing.lock().expect("failing lock").remove(id);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| payload_id(&call.payload).as_deref() == Some(id))
            .count()
    }

    pub fn called_ids(&self) -> HashSet<String> {
        self.calls()
            .iter()
            .filter_map(|call| payload_id(&call.payload))
            .collect()
    }

    async fn handle(
        &self,
        operation: SyncOperation,
        payload: &SyncPayload,
    ) -> Result<(), RemoteApplyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let value = payload.as_json().clone();
        let id = payload_id(&value);
        self.calls.lock().expect("calls lock").push(RemoteCall {
            operation,
            payload: value,
        });

        let failure = id.and_then(|id| self.failing.lock().expect("failing lock").get(&id).cloned());
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteApplyHandler for ScriptedHandler {
    async fn apply_create(&self, payload: &SyncPayload) -> Result<(), RemoteApplyError> {
        self.handle(SyncOperation::Create, payload).await
    }

    async fn apply_update(&self, payload: &SyncPayload) -> Result<(), RemoteApplyError> {
        self.handle(SyncOperation::Update, payload).await
    }

    async fn apply_delete(&self, payload: &SyncPayload) -> Result<(), RemoteApplyError> {
        self.handle(SyncOperation::Delete, payload).await
    }
}

/// Same scripted handler for every entity type.
pub fn registry_for_all(handler: Arc<ScriptedHandler>) -> RemoteApplyRegistry {
    EntityType::ALL
        .iter()
        .fold(RemoteApplyRegistry::new(), |registry, entity_type| {
            registry.with_handler(*entity_type, handler.clone())
        })
}

fn payload_id(payload: &Value) -> Option<String> {
    match payload.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}
