use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Create => "create",
            SyncOperation::Update => "update",
            SyncOperation::Delete => "delete",
        }
    }

    /// Operation left in the queue when `newer` overwrites a still-pending `self`.
    /// A record that was never created remotely must still be sent as a create.
    ///
    /// A create followed by a delete stays a delete rather than dropping the
    /// item: the create may already be in flight, so the remote has to hear about
    /// the delete. Delete handlers should treat an unknown record as success.
    pub fn coalesce(self, newer: SyncOperation) -> SyncOperation {
        match (self, newer) {
            (SyncOperation::Create, SyncOperation::Update) => SyncOperation::Create,
            (_, newer) => newer,
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(SyncOperation::Create),
            "update" => Ok(SyncOperation::Update),
            "delete" => Ok(SyncOperation::Delete),
            other => Err(format!("Unknown sync operation: {other}")),
        }
    }
}
