//! # Ports
//!
//! Every adapter must implement these traits to be wired into the binary.
//! Services only ever see `Arc<dyn Port>`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DomainResult;
use crate::models::{Actor, Comment, Plant, PlantFilter, PlantImage, Rating, User, WishList};

/// Persistence contract for plants. Deleting a plant removes everything it
/// owns (images, comments, ratings, wishlist entries).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PlantRepository: Send + Sync {
    async fn insert(&self, plant: &Plant) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Plant>>;
    /// Plants matching `filter`, ordered by name.
    async fn list(&self, filter: &PlantFilter) -> DomainResult<Vec<Plant>>;
    /// Returns `false` when no plant has `plant.id`.
    async fn update(&self, plant: &Plant) -> DomainResult<bool>;
    async fn delete(&self, id: Uuid) -> DomainResult<bool>;
}

/// Persistence contract for the comment tree.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: &Comment) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Comment>>;
    /// All comments, or only those on `plant_id`, oldest first.
    async fn list(&self, plant_id: Option<Uuid>) -> DomainResult<Vec<Comment>>;
    /// Comments on `plant_id` with no parent, oldest first.
    async fn top_level(&self, plant_id: Uuid) -> DomainResult<Vec<Comment>>;
    /// Up to `limit` direct replies of `parent_id`, oldest first.
    async fn replies(&self, parent_id: Uuid, limit: usize) -> DomainResult<Vec<Comment>>;
    async fn count_replies(&self, parent_id: Uuid) -> DomainResult<usize>;
    async fn update(&self, comment: &Comment) -> DomainResult<bool>;
    /// Removes the comment and its whole reply subtree and returns the
    /// removed rows (empty when `id` is unknown).
    async fn delete(&self, id: Uuid) -> DomainResult<Vec<Comment>>;
}

/// Outcome of pointing an existing wishlist entry at another plant.
#[derive(Debug, Clone, PartialEq)]
pub enum Reassign {
    Moved(WishList),
    /// The user already has an entry for the target plant.
    Duplicate,
    Missing,
}

/// Persistence contract for wishlists. Implementations must enforce
/// (user, plant) uniqueness themselves; the service never checks first.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WishListRepository: Send + Sync {
    /// Atomically returns the existing entry for (user, plant), or creates
    /// one. The flag is `true` only when this call created the entry.
    async fn get_or_create(&self, user_id: Uuid, plant_id: Uuid) -> DomainResult<(WishList, bool)>;
    async fn list_for_user(&self, user_id: Uuid) -> DomainResult<Vec<WishList>>;
    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> DomainResult<Option<WishList>>;
    async fn reassign(&self, user_id: Uuid, id: Uuid, plant_id: Uuid) -> DomainResult<Reassign>;
    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> DomainResult<bool>;
}

/// Persistence contract for ratings.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Inserts unless (plant, user) is already rated; `false` in that case.
    async fn insert_unique(&self, rating: &Rating) -> DomainResult<bool>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Rating>>;
    async fn list(&self, plant_id: Option<Uuid>) -> DomainResult<Vec<Rating>>;
    /// Every rating value recorded for `plant_id`.
    async fn values_for_plant(&self, plant_id: Uuid) -> DomainResult<Vec<i16>>;
    async fn update_value(&self, id: Uuid, value: i16) -> DomainResult<bool>;
    async fn delete(&self, id: Uuid) -> DomainResult<bool>;
}

/// Persistence contract for plant image metadata.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PlantImageRepository: Send + Sync {
    async fn insert(&self, image: &PlantImage) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<PlantImage>>;
    /// Images of `plant_id`, oldest upload first.
    async fn list_for_plant(&self, plant_id: Uuid) -> DomainResult<Vec<PlantImage>>;
    async fn list_all(&self) -> DomainResult<Vec<PlantImage>>;
    async fn delete(&self, id: Uuid) -> DomainResult<bool>;
}

/// Persistence contract for accounts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns `false` when the email or username is already registered.
    async fn insert(&self, user: &User) -> DomainResult<bool>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>>;
}

/// Object storage for image bytes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Saves `data` under `key` and returns the reference to persist.
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> DomainResult<String>;
    /// A time-limited URL granting read access to `reference`.
    async fn signed_url(&self, reference: &str, ttl: Duration) -> DomainResult<String>;
    async fn delete(&self, reference: &str) -> DomainResult<()>;
}

/// Outbound, best-effort message channel.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> DomainResult<()>;
}

/// One-way password hashing.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> DomainResult<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// A bearer token handed to a client after login.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks bearer tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, actor: &Actor) -> DomainResult<IssuedToken>;
    /// Resolves a token to its identity, `DomainError::Unauthenticated`
    /// when it is malformed, forged or expired.
    fn verify(&self, token: &str) -> DomainResult<Actor>;
}
