use crate::domain::value_objects::{EntityType, SyncOperation, SyncPayload};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteApplyError {
    /// Network error, 5xx and the like. Retried up to the bound.
    #[error("Transient remote failure: {0}")]
    Transient(String),

    /// The backend rejected the payload. Never retried automatically.
    #[error("Remote rejected the change: {0}")]
    Permanent(String),

    #[error("Remote call timed out after {0} ms")]
    Timeout(u64),

    #[error("No remote handler registered for {0}")]
    MissingHandler(EntityType),
}

impl RemoteApplyError {
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            RemoteApplyError::Permanent(_) | RemoteApplyError::MissingHandler(_)
        )
    }
}

/// Backend integration for one entity type. The protocol behind it is opaque to the engine.
#[async_trait]
pub trait RemoteApplyHandler: Send + Sync {
    async fn apply_create(&self, payload: &SyncPayload) -> Result<(), RemoteApplyError>;
    async fn apply_update(&self, payload: &SyncPayload) -> Result<(), RemoteApplyError>;
    async fn apply_delete(&self, payload: &SyncPayload) -> Result<(), RemoteApplyError>;
}

/// Per-entity-type handler table.
#[derive(Clone, Default)]
pub struct RemoteApplyRegistry {
    handlers: HashMap<EntityType, Arc<dyn RemoteApplyHandler>>,
}

impl RemoteApplyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(
        mut self,
        entity_type: EntityType,
        handler: Arc<dyn RemoteApplyHandler>,
    ) -> Self {
        self.register(entity_type, handler);
        self
    }

    pub fn register(&mut self, entity_type: EntityType, handler: Arc<dyn RemoteApplyHandler>) {
        self.handlers.insert(entity_type, handler);
    }

    pub fn handler(&self, entity_type: EntityType) -> Option<Arc<dyn RemoteApplyHandler>> {
        self.handlers.get(&entity_type).cloned()
    }

    pub async fn apply(
        &self,
        entity_type: EntityType,
        operation: SyncOperation,
        payload: &SyncPayload,
    ) -> Result<(), RemoteApplyError> {
        let handler = self
            .handler(entity_type)
            .ok_or(RemoteApplyError::MissingHandler(entity_type))?;

        match operation {
            SyncOperation::Create => handler.apply_create(payload).await,
            SyncOperation::Update => handler.apply_update(payload).await,
            SyncOperation::Delete => handler.apply_delete(payload).await,
        }
    }
}
