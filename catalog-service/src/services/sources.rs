use crate::models::Source;
use crate::query::{FilterTree, Predicate};
use crate::security::SecuredStore;
use service_core::error::AppError;

pub fn by_name(name: &str) -> FilterTree {
    FilterTree::field(Predicate::eq("name", name))
}

pub async fn find_all(store: &SecuredStore) -> Result<Vec<Source>, AppError> {
    store.find_many::<Source>(None).await
}

pub async fn find_by_name(store: &SecuredStore, name: &str) -> Result<Option<Source>, AppError> {
    store.find_unique::<Source>(by_name(name)).await
}
