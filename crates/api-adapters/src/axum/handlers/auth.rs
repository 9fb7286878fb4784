use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::IssuedToken;
use services::users::{Credentials, Registration};
use services::views::UserView;

use crate::axum::error::ApiResult;
use crate::axum::extract::Payload;
use crate::axum::AppState;

pub async fn register(
    State(state): State<AppState>,
    Payload(input): Payload<Registration>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let user = state.services.users.register(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn token(
    State(state): State<AppState>,
    Payload(credentials): Payload<Credentials>,
) -> ApiResult<Json<IssuedToken>> {
    Ok(Json(state.services.users.login(credentials).await?))
}
