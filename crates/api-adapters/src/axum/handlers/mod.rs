pub mod auth;
pub mod comments;
pub mod images;
pub mod media;
pub mod plants;
pub mod ratings;
pub mod wishlists;

use axum::extract::Multipart;
use domains::{DomainError, Upload};

use super::error::ApiResult;

/// Multipart field carrying the file on every upload route.
pub(crate) const UPLOAD_FIELD: &str = "image";

/// Pulls the first `image` field out of a multipart body. The declared
/// content type wins; otherwise it is guessed from the file name.
pub(crate) async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = match field.content_type() {
            Some(ct) => ct.to_string(),
            None => file_name
                .as_deref()
                .map(|name| mime_guess::from_path(name).first_or_octet_stream())
                .unwrap_or(mime::APPLICATION_OCTET_STREAM)
                .to_string(),
        };
        let data = field.bytes().await?;
        return Ok(Upload {
            file_name,
            content_type,
            data,
        });
    }
    Err(DomainError::validation(UPLOAD_FIELD, "No file was submitted.").into())
}
