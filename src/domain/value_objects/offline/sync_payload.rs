use super::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record snapshot carried by a queue item. The queue never looks inside it
/// apart from reading the record id at enqueue time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncPayload(Value);

impl SyncPayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    /// The `id` field of an object payload, as a string.
    pub fn entity_id(&self) -> Result<EntityId, String> {
        let raw = match self.0.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(_) => return Err("Payload id must be a string or a number".to_string()),
            None => return Err("Payload must be an object with an `id` field".to_string()),
        };
        EntityId::new(raw)
    }

    fn validate(value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Err("Sync payload cannot be null".to_string());
        }
        Ok(())
    }
}

impl From<SyncPayload> for Value {
    fn from(payload: SyncPayload) -> Self {
        payload.0
    }
}
