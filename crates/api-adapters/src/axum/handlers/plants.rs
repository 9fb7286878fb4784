use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::PlantFilter;
use services::plants::PlantDraft;
use services::views::{PlantDetail, PlantSummary};
use uuid::Uuid;

use crate::axum::error::ApiResult;
use crate::axum::extract::{ApiPath, ApiQuery, MaybeUser, Payload};
use crate::axum::AppState;

pub async fn list(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiQuery(filter): ApiQuery<PlantFilter>,
) -> ApiResult<Json<Vec<PlantSummary>>> {
    Ok(Json(state.services.plants.list(actor.as_ref(), &filter).await?))
}

pub async fn create(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    Payload(draft): Payload<PlantDraft>,
) -> ApiResult<(StatusCode, Json<PlantDetail>)> {
    let plant = state.services.plants.create(actor.as_ref(), draft).await?;
    Ok((StatusCode::CREATED, Json(plant)))
}

pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<PlantDetail>> {
    Ok(Json(state.services.plants.detail(actor.as_ref(), id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
    Payload(draft): Payload<PlantDraft>,
) -> ApiResult<Json<PlantDetail>> {
    Ok(Json(state.services.plants.update(actor.as_ref(), id, draft).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.plants.delete(actor.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
