use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business-object category a queued mutation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Client,
    Inspection,
    Report,
    Photo,
    Signature,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Client,
        EntityType::Inspection,
        EntityType::Report,
        EntityType::Photo,
        EntityType::Signature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Client => "client",
            EntityType::Inspection => "inspection",
            EntityType::Report => "report",
            EntityType::Photo => "photo",
            EntityType::Signature => "signature",
        }
    }

    /// Local table holding the business records of this type.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityType::Client => "clients",
            EntityType::Inspection => "inspections",
            EntityType::Report => "reports",
            EntityType::Photo => "photos",
            EntityType::Signature => "signatures",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Portuguese names are what the field app stores in older queues.
        match value.trim().to_ascii_lowercase().as_str() {
            "client" | "cliente" | "clients" | "clientes" => Ok(EntityType::Client),
            "inspection" | "vistoria" | "inspections" | "vistorias" => Ok(EntityType::Inspection),
            "report" | "relatorio" | "reports" | "relatorios" => Ok(EntityType::Report),
            "photo" | "foto" | "photos" | "fotos" => Ok(EntityType::Photo),
            "signature" | "assinatura" | "signatures" | "assinaturas" => {
                Ok(EntityType::Signature)
            }
            "" => Err("Entity type cannot be empty".to_string()),
            other => Err(format!("Unknown entity type: {other}")),
        }
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}
