use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use services::views::WishListView;
use services::wishlists::WishListInput;
use uuid::Uuid;

use crate::axum::error::ApiResult;
use crate::axum::extract::{ApiPath, MaybeUser, Payload};
use crate::axum::AppState;

pub async fn list(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
) -> ApiResult<Json<Vec<WishListView>>> {
    Ok(Json(state.services.wishlists.list(actor.as_ref()).await?))
}

pub async fn add(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    Payload(input): Payload<WishListInput>,
) -> ApiResult<(StatusCode, Json<WishListView>)> {
    let entry = state.services.wishlists.add(actor.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<WishListView>> {
    Ok(Json(state.services.wishlists.get(actor.as_ref(), id).await?))
}

pub async fn move_to(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
    Payload(input): Payload<WishListInput>,
) -> ApiResult<Json<WishListView>> {
    Ok(Json(state.services.wishlists.move_to(actor.as_ref(), id, input).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.wishlists.remove(actor.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
