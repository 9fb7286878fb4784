//! Serves objects of the local media backend behind signed URLs.

use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use domains::DomainError;
use serde::Deserialize;
use tracing::debug;

use crate::axum::error::ApiResult;
use crate::axum::extract::{ApiPath, ApiQuery};
use crate::axum::AppState;

#[derive(Debug, Deserialize)]
pub struct Signature {
    pub expires: i64,
    pub signature: String,
}

pub async fn serve(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
    ApiQuery(sig): ApiQuery<Signature>,
) -> ApiResult<Response> {
    let storage = state
        .local_media
        .as_ref()
        .ok_or_else(|| DomainError::not_found("Media", &key))?;
    let now = chrono::Utc::now().timestamp();
    if !storage.verify(&key, sig.expires, &sig.signature, now) {
        debug!(%key, "rejected media signature");
        return Err(DomainError::Forbidden.into());
    }

    let data = storage.read(&key).await?;
    let content_type = mime_guess::from_path(&key).first_or_octet_stream();
    Ok((
        [
            (CONTENT_TYPE, content_type.to_string()),
            (CACHE_CONTROL, "private, max-age=300".to_string()),
        ],
        data,
    )
        .into_response())
}
