use crate::models::SecurityDescriptor;
use crate::security::registry::{Entity, EntityType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub security: SecurityDescriptor,
}

impl Source {
    pub fn new(name: impl Into<String>, security: SecurityDescriptor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            display_name: None,
            security,
        }
    }
}

impl Entity for Source {
    const ENTITY: EntityType = EntityType::Source;
    const COLLECTION: &'static str = "sources";
    const PROTECTED: bool = true;
}
