use crate::models::SecurityDescriptor;
use crate::security::registry::{Entity, EntityType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Image,
    Video,
    Audio,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewAsset {
    #[serde(rename = "type")]
    pub kind: AssetType,
    pub external_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub stream_id: String,
    pub name: String,
    pub security: SecurityDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub preview_assets: Vec<PreviewAsset>,
}

impl ContentItem {
    pub fn new(stream_id: impl Into<String>, name: impl Into<String>, security: SecurityDescriptor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stream_id: stream_id.into(),
            name: name.into(),
            security,
            external_ref: None,
            preview_assets: Vec::new(),
        }
    }
}

impl Entity for ContentItem {
    const ENTITY: EntityType = EntityType::ContentItem;
    const COLLECTION: &'static str = "content_items";
    const PROTECTED: bool = true;
}
