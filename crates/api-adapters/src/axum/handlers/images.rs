use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use services::views::ImageView;
use uuid::Uuid;

use super::read_upload;
use crate::axum::error::ApiResult;
use crate::axum::extract::{ApiPath, MaybeUser};
use crate::axum::AppState;

pub async fn upload(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(plant_id): ApiPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<ImageView>)> {
    let upload = read_upload(multipart?).await?;
    let image = state
        .services
        .images
        .upload(actor.as_ref(), plant_id, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn list_for_plant(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(plant_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<ImageView>>> {
    Ok(Json(
        state
            .services
            .images
            .list_for_plant(actor.as_ref(), plant_id)
            .await?,
    ))
}

pub async fn primary_url(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(plant_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let url = state
        .services
        .images
        .primary_url(actor.as_ref(), plant_id)
        .await?;
    Ok(Json(json!({ "url": url })))
}

pub async fn list(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
) -> ApiResult<Json<Vec<ImageView>>> {
    Ok(Json(state.services.images.list(actor.as_ref()).await?))
}

pub async fn get(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ImageView>> {
    Ok(Json(state.services.images.get(actor.as_ref(), id).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.images.delete(actor.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
