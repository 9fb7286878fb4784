use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use services::ratings::{NewRating, RatingEdit};
use services::views::RatingView;
use uuid::Uuid;

use crate::axum::error::ApiResult;
use crate::axum::extract::{ApiPath, ApiQuery, MaybeUser, Payload};
use crate::axum::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RatingQuery {
    pub plant: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiQuery(query): ApiQuery<RatingQuery>,
) -> ApiResult<Json<Vec<RatingView>>> {
    Ok(Json(state.services.ratings.list(actor.as_ref(), query.plant).await?))
}

pub async fn rate(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    Payload(input): Payload<NewRating>,
) -> ApiResult<(StatusCode, Json<RatingView>)> {
    let rating = state.services.ratings.rate(actor.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

pub async fn update(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
    Payload(edit): Payload<RatingEdit>,
) -> ApiResult<Json<RatingView>> {
    Ok(Json(state.services.ratings.update(actor.as_ref(), id, edit).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.ratings.delete(actor.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
