//! Stream reads and the single stream write path.

use crate::lifecycle::staleness::stale_filter;
use crate::models::{Stream, StreamUpdate};
use crate::query::{FilterTree, Predicate};
use crate::security::SecuredStore;
use crate::services::sources;
use chrono::{DateTime, Utc};
use service_core::error::AppError;

pub fn by_name(name: &str) -> FilterTree {
    FilterTree::field(Predicate::eq("name", name))
}

pub async fn find_by_name(store: &SecuredStore, name: &str) -> Result<Option<Stream>, AppError> {
    store.find_unique::<Stream>(by_name(name)).await
}

/// Streams of the named source, or `None` when the source is not visible.
pub async fn find_by_source(
    store: &SecuredStore,
    source_name: &str,
) -> Result<Option<Vec<Stream>>, AppError> {
    let Some(source) = sources::find_by_name(store, source_name).await? else {
        return Ok(None);
    };
    let filter = FilterTree::field(Predicate::eq("sourceId", source.id));
    Ok(Some(store.find_many::<Stream>(Some(filter)).await?))
}

pub async fn find_stale(store: &SecuredStore, now: DateTime<Utc>) -> Result<Vec<Stream>, AppError> {
    store.find_many::<Stream>(Some(stale_filter(now))).await
}

/// Apply a partial update to the named stream and return it as the caller
/// may see it.
///
/// The write itself is not filtered by the caller's access context. Returns
/// `None` when no stream has that name, or when the updated stream is hidden
/// from the caller.
pub async fn update(
    store: &SecuredStore,
    name: &str,
    update: &StreamUpdate,
    now: DateTime<Utc>,
) -> Result<Option<Stream>, AppError> {
    let spec = update.to_update_spec(now);
    let Some(stream) = store.update_one::<Stream>(&by_name(name), &spec).await? else {
        return Ok(None);
    };

    tracing::info!(
        stream = %stream.name,
        state = ?stream.state,
        user = %store.context().user_name(),
        "Stream updated"
    );

    if store.context().privileged {
        return Ok(Some(stream));
    }
    find_by_name(store, name).await
}
