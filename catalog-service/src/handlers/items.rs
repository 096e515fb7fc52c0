use crate::dtos::ContentItemResponse;
use crate::security::SecuredStore;
use crate::services::items;
use axum::{extract::Path, response::IntoResponse, Json};
use service_core::error::AppError;

pub async fn get_item(
    store: SecuredStore,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let item = items::find_by_id(&store, &key).await?;
    Ok(Json(ContentItemResponse::from(item)))
}
