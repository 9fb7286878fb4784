use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use services::comments::{CommentEdit, NewComment};
use services::views::{CommentNode, CommentView};
use tracing::debug;
use uuid::Uuid;

use super::read_upload;
use crate::axum::error::ApiResult;
use crate::axum::extract::{ApiPath, ApiQuery, MaybeUser, Payload};
use crate::axum::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CommentQuery {
    pub plant: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiQuery(query): ApiQuery<CommentQuery>,
) -> ApiResult<Json<Vec<CommentView>>> {
    Ok(Json(state.services.comments.list(actor.as_ref(), query.plant).await?))
}

pub async fn create(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    Payload(input): Payload<NewComment>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    let comment = state.services.comments.create(actor.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<CommentView>> {
    Ok(Json(state.services.comments.get(actor.as_ref(), id).await?))
}

pub async fn thread(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<CommentNode>> {
    Ok(Json(state.services.comments.thread(actor.as_ref(), id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
    Payload(edit): Payload<CommentEdit>,
) -> ApiResult<Json<CommentView>> {
    Ok(Json(state.services.comments.update(actor.as_ref(), id, edit).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let removed = state.services.comments.delete(actor.as_ref(), id).await?;
    debug!(%id, removed, "comment subtree deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn attach_image(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<CommentView>> {
    let upload = read_upload(multipart?).await?;
    Ok(Json(
        state
            .services
            .comments
            .attach_image(actor.as_ref(), id, upload)
            .await?,
    ))
}

pub async fn image_url(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let url = state.services.comments.image_url(actor.as_ref(), id).await?;
    Ok(Json(json!({ "url": url })))
}
