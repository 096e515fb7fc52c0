use crate::dtos::{SourceResponse, StreamResponse};
use crate::security::SecuredStore;
use crate::services::{sources, streams};
use axum::{extract::Path, response::IntoResponse, Json};
use service_core::error::AppError;

pub async fn list_sources(store: SecuredStore) -> Result<impl IntoResponse, AppError> {
    let sources = sources::find_all(&store).await?;
    Ok(Json(
        sources
            .into_iter()
            .map(SourceResponse::from)
            .collect::<Vec<_>>(),
    ))
}

pub async fn get_source(
    store: SecuredStore,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let source = sources::find_by_name(&store, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Source not found")))?;
    Ok(Json(SourceResponse::from(source)))
}

pub async fn list_source_streams(
    store: SecuredStore,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let streams = streams::find_by_source(&store, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Source not found")))?;
    Ok(Json(
        streams
            .into_iter()
            .map(StreamResponse::from)
            .collect::<Vec<_>>(),
    ))
}
