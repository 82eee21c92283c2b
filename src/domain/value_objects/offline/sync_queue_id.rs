use super::{EntityId, EntityType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Queue key. One key per business record, so a second mutation of the same
/// record overwrites the pending one instead of queueing behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncQueueId(String);

impl SyncQueueId {
    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("Sync queue id cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn for_entity(entity_type: EntityType, entity_id: &EntityId) -> Self {
        Self(format!("{}:{}", entity_type.as_str(), entity_id.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SyncQueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SyncQueueId> for String {
    fn from(id: SyncQueueId) -> Self {
        id.0
    }
}
