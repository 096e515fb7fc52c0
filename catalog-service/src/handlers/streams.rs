use crate::dtos::{ContentItemResponse, StreamResponse, StreamUpdateRequest};
use crate::security::SecuredStore;
use crate::services::{items, streams};
use axum::{extract::Path, response::IntoResponse, Json};
use chrono::Utc;
use service_core::error::AppError;

pub async fn list_stale_streams(store: SecuredStore) -> Result<impl IntoResponse, AppError> {
    let stale = streams::find_stale(&store, Utc::now()).await?;
    Ok(Json(
        stale
            .into_iter()
            .map(StreamResponse::from)
            .collect::<Vec<_>>(),
    ))
}

pub async fn update_stream(
    store: SecuredStore,
    Path(key): Path<String>,
    Json(payload): Json<StreamUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let update = payload.into_update()?;
    let stream = streams::update(&store, &key, &update, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Stream not found")))?;
    Ok(Json(StreamResponse::from(stream)))
}

pub async fn list_stream_items(
    store: SecuredStore,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let items = items::find_by_stream(&store, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Stream not found")))?;
    Ok(Json(
        items
            .into_iter()
            .map(ContentItemResponse::from)
            .collect::<Vec<_>>(),
    ))
}
