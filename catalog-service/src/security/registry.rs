//! Schema capability registry.
//!
//! Each persisted entity declares at compile time whether it embeds a
//! [`SecurityDescriptor`](crate::models::SecurityDescriptor). The registry is
//! built once from those declarations and answers "is this a protected model"
//! for the query interceptor.

use serde::de::DeserializeOwned;
use serde::Serialize;
use service_core::error::AppError;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    User,
    Source,
    Stream,
    ContentItem,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::User,
        EntityType::Source,
        EntityType::Stream,
        EntityType::ContentItem,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityType::User => "User",
            EntityType::Source => "Source",
            EntityType::Stream => "Stream",
            EntityType::ContentItem => "ContentItem",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SchemaError> {
        EntityType::ALL
            .into_iter()
            .find(|e| e.name() == name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A persisted entity type.
///
/// `PROTECTED` must be true exactly when the type embeds a `security` field.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin {
    const ENTITY: EntityType;
    const COLLECTION: &'static str;
    const PROTECTED: bool;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("entity type {0} has no registered capability")]
    Unregistered(EntityType),

    #[error("unknown entity type {0}")]
    UnknownEntity(String),
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        AppError::SchemaError(anyhow::Error::new(err))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    capabilities: HashMap<EntityType, bool>,
}

impl SchemaRegistry {
    /// Registry covering every entity persisted by this service.
    pub fn canonical() -> Self {
        use crate::models::{ContentItem, Source, Stream, User};

        Self::default()
            .register::<User>()
            .register::<Source>()
            .register::<Stream>()
            .register::<ContentItem>()
    }

    pub fn register<E: Entity>(mut self) -> Self {
        self.capabilities.insert(E::ENTITY, E::PROTECTED);
        self
    }

    pub fn is_protected(&self, entity: EntityType) -> Result<bool, SchemaError> {
        self.capabilities
            .get(&entity)
            .copied()
            .ok_or(SchemaError::Unregistered(entity))
    }

    pub fn is_protected_name(&self, name: &str) -> Result<bool, SchemaError> {
        self.is_protected(EntityType::from_name(name)?)
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.capabilities.keys().copied()
    }
}
