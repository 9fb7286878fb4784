//! # Axum adapter
//!
//! `router` builds the whole JSON API under `/api/verdespace` with request
//! tracing, request ids and CORS applied.

pub mod error;
pub mod extract;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use services::Services;
use storage_adapters::LocalMediaStorage;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

pub const API_PREFIX: &str = "/api/verdespace";

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Set when media lives on the local filesystem; signed URLs then point
    /// back at this server's `/media` route.
    pub local_media: Option<Arc<LocalMediaStorage>>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            local_media: None,
        }
    }

    pub fn with_local_media(mut self, storage: Arc<LocalMediaStorage>) -> Self {
        self.local_media = Some(storage);
        self
    }
}

pub fn router(state: AppState) -> Router {
    use handlers::{auth, comments, images, media, plants, ratings, wishlists};

    // Oversized files must reach the upload validation, which answers 400.
    let body_limit = state.services.images.policy().max_bytes * 2 + MULTIPART_OVERHEAD;

    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/token", post(auth::token))
        .route("/plants", get(plants::list).post(plants::create))
        .route(
            "/plants/{id}",
            get(plants::detail).put(plants::update).delete(plants::remove),
        )
        .route(
            "/plants/{id}/images",
            get(images::list_for_plant).post(images::upload),
        )
        .route("/plants/{id}/image-url", get(images::primary_url))
        .route("/plant-images", get(images::list))
        .route("/plant-images/{id}", get(images::get).delete(images::remove))
        .route("/comments", get(comments::list).post(comments::create))
        .route(
            "/comments/{id}",
            get(comments::get).put(comments::update).delete(comments::remove),
        )
        .route("/comments/{id}/thread", get(comments::thread))
        .route("/comments/{id}/image", post(comments::attach_image))
        .route("/comments/{id}/image-url", get(comments::image_url))
        .route("/wishlists", get(wishlists::list).post(wishlists::add))
        .route(
            "/wishlists/{id}",
            get(wishlists::get).put(wishlists::move_to).delete(wishlists::remove),
        )
        .route("/ratings", get(ratings::list).post(ratings::rate))
        .route("/ratings/{id}", axum::routing::put(ratings::update).delete(ratings::remove))
        .route("/media/{*key}", get(media::serve));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
