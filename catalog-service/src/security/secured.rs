//! Store handle bound to an [`AccessContext`].
//!
//! Every typed read goes through [`secure_filter`] before reaching the
//! underlying [`DocumentStore`]. Writes pass through unchanged.

use crate::query::FilterTree;
use crate::security::context::AccessContext;
use crate::security::interceptor::{secure_filter, ReadOperation};
use crate::security::registry::{Entity, SchemaRegistry};
use crate::services::store::{DocumentStore, UpdateSpec};
use crate::startup::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use mongodb::bson::{self, Document};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct SecuredStore {
    store: Arc<dyn DocumentStore>,
    registry: Arc<SchemaRegistry>,
    context: AccessContext,
}

impl SecuredStore {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: Arc<SchemaRegistry>,
        context: AccessContext,
    ) -> Self {
        Self {
            store,
            registry,
            context,
        }
    }

    pub fn context(&self) -> &AccessContext {
        &self.context
    }

    fn secure<E: Entity>(
        &self,
        operation: ReadOperation,
        filter: Option<FilterTree>,
    ) -> Result<Option<FilterTree>, AppError> {
        Ok(secure_filter(
            &self.registry,
            E::ENTITY,
            operation,
            filter,
            self.context.privileged,
        )?)
    }

    pub async fn find_many<E: Entity>(
        &self,
        filter: Option<FilterTree>,
    ) -> Result<Vec<E>, AppError> {
        let filter = self.secure::<E>(ReadOperation::FindMany, filter)?;
        let rows = self.store.find_many(E::COLLECTION, filter.as_ref()).await?;
        rows.into_iter()
            .map(|row| bson::from_document(row).map_err(AppError::from))
            .collect()
    }

    pub async fn find_unique<E: Entity>(&self, filter: FilterTree) -> Result<Option<E>, AppError> {
        let filter = self
            .secure::<E>(ReadOperation::FindUnique, Some(filter))?
            .unwrap_or_default();
        self.store
            .find_one(E::COLLECTION, &filter)
            .await?
            .map(bson::from_document)
            .transpose()
            .map_err(AppError::from)
    }

    /// Like [`find_unique`](Self::find_unique) but an absent or filtered-out
    /// row is `NotFound`, indistinguishable from one that never existed.
    pub async fn find_unique_or_fail<E: Entity>(&self, filter: FilterTree) -> Result<E, AppError> {
        let filter = self
            .secure::<E>(ReadOperation::FindUniqueOrFail, Some(filter))?
            .unwrap_or_default();
        let row = self
            .store
            .find_one(E::COLLECTION, &filter)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("{} not found", E::ENTITY)))?;
        Ok(bson::from_document(row)?)
    }

    pub async fn update_one<E: Entity>(
        &self,
        filter: &FilterTree,
        update: &UpdateSpec,
    ) -> Result<Option<E>, AppError> {
        self.store
            .update_one(E::COLLECTION, filter, update)
            .await?
            .map(bson::from_document)
            .transpose()
            .map_err(AppError::from)
    }

    pub async fn insert<E: Entity>(&self, entity: &E) -> Result<(), AppError> {
        let document: Document = bson::to_document(entity)?;
        self.store.insert_one(E::COLLECTION, document).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SecuredStore {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let context = AccessContext::from_request_parts(parts, state).await?;
        Ok(SecuredStore::new(
            state.store.clone(),
            state.registry.clone(),
            context,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SecurityDescriptor, Source, User};
    use crate::query::Predicate;
    use crate::security::registry::EntityType;
    use crate::services::store::MemoryStore;

    async fn seeded() -> Arc<dyn DocumentStore> {
        let store = Arc::new(MemoryStore::new());
        for source in [
            Source::new("com.alpha", SecurityDescriptor::protected()),
            Source::new("com.beta", SecurityDescriptor::public()),
        ] {
            store
                .insert_one(Source::COLLECTION, bson::to_document(&source).unwrap())
                .await
                .unwrap();
        }
        store
    }

    fn handle(store: Arc<dyn DocumentStore>, privileged: bool) -> SecuredStore {
        let user = User::new(if privileged { "Admin" } else { "Joe" }, privileged);
        SecuredStore::new(
            store,
            Arc::new(SchemaRegistry::canonical()),
            AccessContext::for_user(&user),
        )
    }

    fn by_name(name: &str) -> FilterTree {
        FilterTree::field(Predicate::eq("name", name))
    }

    #[tokio::test]
    async fn test_find_many_hides_protected_rows() {
        let store = seeded().await;

        let admin = handle(store.clone(), true).find_many::<Source>(None).await.unwrap();
        assert_eq!(admin.len(), 2);

        let joe = handle(store, false).find_many::<Source>(None).await.unwrap();
        assert_eq!(joe.len(), 1);
        assert_eq!(joe[0].name, "com.beta");
    }

    #[tokio::test]
    async fn test_filtered_unique_read_is_absent() {
        let joe = handle(seeded().await, false);

        assert!(joe.find_unique::<Source>(by_name("com.alpha")).await.unwrap().is_none());
        assert!(joe.find_unique::<Source>(by_name("com.beta")).await.unwrap().is_some());

        let err = joe
            .find_unique_or_fail::<Source>(by_name("com.alpha"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Source not found");
    }

    #[tokio::test]
    async fn test_or_filter_does_not_leak_protected_rows() {
        let joe = handle(seeded().await, false);
        let either = FilterTree::or([by_name("com.alpha"), by_name("com.beta")]);

        let rows = joe.find_many::<Source>(Some(either)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "com.beta");
    }

    #[tokio::test]
    async fn test_unregistered_entity_surfaces_schema_error() {
        let store = seeded().await;
        let secured = SecuredStore::new(
            store,
            Arc::new(SchemaRegistry::default().register::<User>()),
            AccessContext::system(),
        );

        let err = secured.find_many::<Source>(None).await.unwrap_err();
        assert!(matches!(err, AppError::SchemaError(_)));
        assert!(err.to_string().contains(EntityType::Source.name()));
    }
}
