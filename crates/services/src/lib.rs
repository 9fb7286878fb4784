//! # services
//!
//! Application services for Verdespace. Each service owns one entity's
//! rules: validation, capability checks and the shape of its wire
//! representation. Persistence and side effects go through `domains` ports.

pub mod comments;
pub mod images;
pub mod permissions;
pub mod plants;
pub mod ratings;
pub mod users;
pub mod views;
pub mod wishlists;

use std::sync::Arc;

use domains::{
    CommentRepository, MediaStorage, Notifier, PasswordHasher, PlantImageRepository,
    PlantRepository, RatingRepository, TokenService, UserRepository, WishListRepository,
};

pub use comments::{CommentService, ReplyLimits};
pub use images::{ImageService, UploadPolicy};
pub use plants::PlantService;
pub use ratings::RatingService;
pub use users::UserService;
pub use wishlists::WishListService;

/// Every adapter a `Services` bundle needs.
#[derive(Clone)]
pub struct Ports {
    pub plants: Arc<dyn PlantRepository>,
    pub images: Arc<dyn PlantImageRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub wishlists: Arc<dyn WishListRepository>,
    pub ratings: Arc<dyn RatingRepository>,
    pub users: Arc<dyn UserRepository>,
    pub media: Arc<dyn MediaStorage>,
    pub notifier: Arc<dyn Notifier>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenService>,
}

/// All services, wired once at startup and shared by every request.
#[derive(Clone)]
pub struct Services {
    pub plants: Arc<PlantService>,
    pub images: Arc<ImageService>,
    pub comments: Arc<CommentService>,
    pub wishlists: Arc<WishListService>,
    pub ratings: Arc<RatingService>,
    pub users: Arc<UserService>,
}

impl Services {
    pub fn new(ports: Ports, policy: UploadPolicy, limits: ReplyLimits) -> Self {
        let ratings = Arc::new(RatingService::new(ports.ratings.clone(), ports.plants.clone()));
        let images = Arc::new(ImageService::new(
            ports.images.clone(),
            ports.plants.clone(),
            ports.media.clone(),
            policy,
        ));
        let comments = Arc::new(CommentService::new(
            ports.comments.clone(),
            ports.plants.clone(),
            ports.media.clone(),
            policy,
            limits,
        ));
        let plants = Arc::new(PlantService::new(
            ports.plants.clone(),
            ports.images.clone(),
            ports.comments.clone(),
            ratings.clone(),
            images.clone(),
            comments.clone(),
            ports.notifier.clone(),
        ));
        let wishlists = Arc::new(WishListService::new(
            ports.wishlists.clone(),
            ports.plants.clone(),
            ratings.clone(),
        ));
        let users = Arc::new(UserService::new(ports.users, ports.hasher, ports.tokens));

        Self {
            plants,
            images,
            comments,
            wishlists,
            ratings,
            users,
        }
    }
}
