use crate::security::registry::{Entity, EntityType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A provisioned principal. Read-only inside this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub privileged: bool,
}

impl User {
    pub fn new(name: impl Into<String>, privileged: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            privileged,
        }
    }
}

impl Entity for User {
    const ENTITY: EntityType = EntityType::User;
    const COLLECTION: &'static str = "users";
    const PROTECTED: bool = false;
}
