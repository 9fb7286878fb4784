//! Maps `DomainError` onto HTTP responses.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    /// The request could not be decoded (bad JSON, query or path).
    BadRequest(String),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => {
                warn!(%message, "malformed request");
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            Self::Domain(DomainError::Validation { field, message }) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "field": field }),
            ),
            Self::Domain(DomainError::Unauthenticated) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "authentication required" }),
            ),
            Self::Domain(DomainError::Forbidden) => (
                StatusCode::FORBIDDEN,
                json!({ "error": "permission denied" }),
            ),
            Self::Domain(DomainError::NotFound { entity, .. }) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{entity} not found") }),
            ),
            Self::Domain(e @ (DomainError::Storage(_) | DomainError::Internal(_))) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
