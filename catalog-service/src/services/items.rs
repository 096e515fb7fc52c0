use crate::models::ContentItem;
use crate::query::{FilterTree, Predicate};
use crate::security::SecuredStore;
use crate::services::streams;
use service_core::error::AppError;

/// Items of the named stream, or `None` when the stream is not visible.
pub async fn find_by_stream(
    store: &SecuredStore,
    stream_name: &str,
) -> Result<Option<Vec<ContentItem>>, AppError> {
    let Some(stream) = streams::find_by_name(store, stream_name).await? else {
        return Ok(None);
    };
    let filter = FilterTree::field(Predicate::eq("streamId", stream.id));
    Ok(Some(store.find_many::<ContentItem>(Some(filter)).await?))
}

pub async fn find_by_id(store: &SecuredStore, id: &str) -> Result<ContentItem, AppError> {
    store
        .find_unique_or_fail::<ContentItem>(FilterTree::field(Predicate::eq("_id", id)))
        .await
}
